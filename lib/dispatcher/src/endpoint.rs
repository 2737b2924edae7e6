use queue_fabric::QueueHandle;

/// Whether a tracked endpoint is a worker's publish or consume side,
/// needed only to print "Consume queue" vs "Publish queue" in backpressure
/// warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    Publish,
    Consume,
}

impl EndpointKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Publish => "Publish",
            Self::Consume => "Consume",
        }
    }
}

/// One queue endpoint the backpressure monitor samples every 2s: a queue
/// name, the worker process that owns this particular endpoint, its
/// declared capacity, and the handle to query `len()` on.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub(crate) owner: String,
    pub(crate) queue_name: String,
    pub(crate) kind: EndpointKind,
    pub(crate) capacity: u32,
    pub(crate) handle: QueueHandle,
}
