mod common;
mod harvest_tests;
mod reconcile_tests;
