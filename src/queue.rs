pub(crate) mod frame_queue;
pub(crate) mod op;
