//! Change-data-capture pipeline: reconcile → poll → fan out → acknowledge.

pub mod ack;
pub mod fanout;
pub mod pipeline;
pub mod poller;
pub mod reconciler;

pub use ack::{AckReport, AckTracker};
pub use fanout::{FanoutReport, SubscriberFanout};
pub use pipeline::{CycleReport, SyncPipeline};
pub use poller::{PollReport, UpdatePoller};
pub use reconciler::{ReconcileOutcome, RegistrationReport, SnapshotReconciler};
