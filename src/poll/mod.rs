//! Job status polling: the per-job loop and the registry that bounds it to one loop per job.

mod poller;
mod registry;

pub use poller::JobPoller;
pub use registry::{PollHandle, PollLease, PollRegistry};
