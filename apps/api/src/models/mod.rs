pub mod customer;
pub mod invoice;
pub mod money;
pub mod user;
