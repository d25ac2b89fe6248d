//! Tower pipeline stages.
//!
//! [`AntiforgeryLayer`] runs the gate and records the verdict.
//! [`RequireAntiforgeryLayer`] turns a failed verdict into a rejection.
//! Both operate on [`RequestContext`](crate::RequestContext), so they sit
//! after the stage that builds the context and attaches the endpoint.

mod enforce;
mod middleware;

pub use enforce::{
    check_antiforgery, AntiforgeryRejection, RequireAntiforgeryLayer, RequireAntiforgeryService,
};
pub use middleware::{AntiforgeryLayer, AntiforgeryService};
