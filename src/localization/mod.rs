/*!
 * Spanish subtitle localization.
 *
 * - `track_scorer`: best subtitle track per language bucket
 * - `credits`: translator and editor credit removal
 * - `honorifics`: honorific transfer from an English or Malay track
 * - `names`: "Name Surname" reordering through an oracle
 * - `pipeline`: per-container job that runs the stages in order
 */

pub mod track_scorer;
pub mod credits;
pub mod honorifics;
pub mod names;
pub mod pipeline;

pub use track_scorer::{ScoredTrack, TrackScorer, TrackSelection};
pub use credits::CreditScrubber;
pub use honorifics::{HonorificMatch, HonorificSource, HonorificTransfer, TransferStats};
pub use names::{NameInversionMap, NameNormalizer, NormalizeOutcome};
pub use pipeline::{Job, JobProgress, JobReport, JobState, LocalizationPipeline, ProgressCallback, StageStats};
