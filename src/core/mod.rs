pub mod evolution;
pub mod proposer;
pub mod providers;
