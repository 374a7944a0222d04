/*!
 * # podsplit - podcast splitter
 *
 * A Rust library that cuts long podcast episodes into short, overlapping
 * segments and prepends a spoken title to each of them.
 *
 * ## Features
 *
 * - Read episode titles and durations from the podcast's RSS feed
 * - Cut every episode into fixed windows that overlap by a few seconds
 * - Name segments `<episode>_part_NN_of_MM.mp3`, recoverable from the name alone
 * - Announce "Part N of M of <title>" at the start of each segment
 * - Convert m4a episodes and record episode durations back into the feed
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `planner`: Overlapping time ranges of an episode
 * - `naming`: Segment filename codec
 * - `feed`: RSS feed index, with source-preserving duration edits
 * - `titles`: Title resolution and the titling pipeline
 * - `media`: External tools behind traits:
 *   - `media::ffmpeg`: ffmpeg/ffprobe audio codec
 *   - `media::speech`: pico2wave speech synthesis
 *   - `media::mock`: file-backed fakes for tests
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod feed;
pub mod file_utils;
pub mod media;
pub mod naming;
pub mod planner;
pub mod titles;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, Failure, RunSummary};
pub use errors::{AppError, FeedError, MediaError, NamingError, PlanError};
pub use feed::{Episode, FeedIndex};
pub use naming::SegmentName;
pub use planner::TimeRange;
pub use titles::SegmentTitler;
