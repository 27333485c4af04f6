mod common;
mod generate_tests;
mod scenario_tests;
