pub(crate) mod stats;
pub(crate) mod tick;
