//! Wake: running an agent through a kenning
//!
//! One wake replays a kenning's frames as conversation turns, delivers a
//! task, and asks for a reflection. The transcript is an owned value that
//! each phase takes and hands back, so the phases can only be chained in
//! order:
//!
//! ```ignore
//! let session = WakeSession::new(llm);
//! let transcript = session.walk_frames(Transcript::new(), &kenning).await?;
//! let transcript = session.deliver_task(transcript, "implement the parser").await?;
//! let outcome = session.collect_reflection(transcript).await?;
//! println!("{}", outcome.reflection);
//! ```
//!
//! Any failed call aborts the wake; nothing is retried.

mod error;
mod session;
mod transcript;

pub use error::{Phase, WakeError};
pub use session::{TurnLimits, WakeOutcome, WakeSession};
pub use transcript::{Transcript, WakeState};
