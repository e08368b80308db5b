pub mod dates;
pub mod portfolio;
