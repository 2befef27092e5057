pub mod account;
pub mod cadre;
pub mod employee;
