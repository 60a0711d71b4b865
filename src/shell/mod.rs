// Composition root.
//
// Responsibilities
// - Read config from the environment.
// - Connect the document store subscriptions and wire the use cases on top of them.
// - Expose the use cases over HTTP and GraphQL.

pub mod config;
pub mod graphql;
pub mod http;
pub mod state;
