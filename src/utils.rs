pub(crate) mod serde ;
