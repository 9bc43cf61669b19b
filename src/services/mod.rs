pub mod aging;
pub mod payment;
pub mod projection;
pub mod rebate;
pub mod sepa;
