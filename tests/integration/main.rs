//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no GPIO
//! hardware required; one time unit is shrunk to 20 ms.

mod controller_tests;
mod mock_hw;
mod protocol_tests;
