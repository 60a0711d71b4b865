pub mod shared {
    pub mod core {
        pub mod session;
        pub mod timestamp;
    }
    pub mod infrastructure {
        pub mod document_store;
    }
}

pub mod modules {
    pub mod gigs {
        pub mod core {
            pub mod event_index;
            pub mod gig;
            pub mod integrity;
            pub mod temporal;
        }
        pub mod use_cases {
            pub mod browse_gigs {
                pub mod handler;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
        }
    }
    pub mod sync {
        pub mod core {
            pub mod handle;
            pub mod retry;
            pub mod state;
        }
        pub mod use_cases {
            pub mod mirror_documents {
                pub mod manager;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
    }
    pub mod users {
        pub mod core {
            pub mod mutation;
            pub mod user;
            pub mod user_cell;
        }
        pub mod use_cases {
            pub mod manage_preferences {
                pub mod coordinator;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
            pub mod sync_profile {
                pub mod synchronizer;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
        }
    }
}

pub mod shell;
