pub mod batch;
pub mod reporting;

#[cfg(test)]
mod reporting_tests;
