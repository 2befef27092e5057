// Employee registration (identifier minting from the cadre sequence) and the
// self-service profile update guarded by the 3-month lock window.

pub mod handlers;
pub mod service;
