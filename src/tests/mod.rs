pub mod identity_tests;
