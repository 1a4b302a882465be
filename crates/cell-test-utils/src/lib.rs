//! # Cell Test Utilities
//!
//! Shared test utilities for the cell tower simulation.
//!
//! Tower actors only need three collaborators, and this crate provides an
//! in-process stand-in for each so tower behavior can be tested without a
//! Redis server or a caller population:
//!
//! - `mock_publisher` - Records every published event; can be told to fail
//! - `mock_caller` - A caller mailbox with timeout-based receive helpers
//! - `draws` - Scripted uniform draws for deterministic admission
//! - `fixtures` - Tower settings and call record builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cell_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let publisher = RecordingPublisher::new();
//!     let (tower, _task) = TestTower::new("7").spawn(&publisher, ScriptedDraws::new([0.5]));
//!     let mut caller = MockCaller::new("caller-1");
//!
//!     let record = test_record("caller-1", 0.0);
//!     tower.hello(record.clone(), caller.reference(), false).await.unwrap();
//!
//!     assert!(caller.recv().await.is_some());
//!     assert_eq!(publisher.events_on("tower-7").len(), 1);
//! }
//! ```

pub mod draws;
pub mod fixtures;
pub mod mock_caller;
pub mod mock_publisher;

// Re-export commonly used items
pub use draws::*;
pub use fixtures::*;
pub use mock_caller::*;
pub use mock_publisher::*;
