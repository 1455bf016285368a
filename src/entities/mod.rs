//! sea-orm entities backing [`crate::store::SqlRecordStore`].

pub mod record;
