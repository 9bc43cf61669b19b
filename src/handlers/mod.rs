pub mod billing;
pub mod company;
pub mod contract;
pub mod general;
pub mod payable;
pub mod report;
