#[cfg(test)]
mod common;
#[cfg(test)]
mod core_tests;
