//! Core business logic - framework-agnostic operations on academic years, payments and passes.
//! Every operation takes a database handle; the HTTP layer only translates.

pub mod academic_year;
pub mod manual;
pub mod pass;
pub mod payment;
pub mod payment_guard;
pub mod rollover;
pub mod settings;
pub mod stage;
pub mod student;
pub mod types;
pub mod verification;
