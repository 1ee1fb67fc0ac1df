//! Database connection and initialization.

pub use mdmq_core::db::DatabaseError;

mdmq_core::define_database!(MdmDatabase, "MDM database migrations complete");
