//! Request protocol between the extraction surface and the summarization host

pub mod handler;
pub mod protocol;
pub mod server;
pub mod surface;

pub use handler::{
    ActivationOutcome, InProcessChannel, RequestHandler, Router, SummarizeHost, SurfaceChannel,
    activate_picker,
};
pub use protocol::{Reply, Request};
pub use server::serve;
pub use surface::{PickMode, PickSurface, PickedElement};
