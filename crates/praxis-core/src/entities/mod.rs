//! Entity structs for all Praxis domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `praxis-db/migrations`). Tenant-owned entities carry `user_id`, the owning
//! doctor. All structs derive `Serialize` and `Deserialize` and are returned
//! as-is by the JSON API.

mod audit;
mod chatbot;
mod checkpoint;
mod clinic;
mod eisenhower;
mod event;
mod habit;
mod indication;
mod lead;
mod page;
mod patient;
mod pipeline;
mod quiz;
mod referral;
mod session;
mod user;

pub use audit::AuditEntry;
pub use chatbot::{ChatbotEdge, ChatbotFlow, ChatbotGraph, ChatbotNode};
pub use checkpoint::Checkpoint;
pub use clinic::{Clinic, Outbound};
pub use eisenhower::{EisenhowerMatrix, EisenhowerTask};
pub use event::Event;
pub use habit::{Habit, HabitStats};
pub use indication::Indication;
pub use lead::Lead;
pub use page::{Address, InterestOption, Page, PageBlock, PageBundle, SocialLink};
pub use patient::Patient;
pub use pipeline::Pipeline;
pub use quiz::{Quiz, QuizQuestion, QuizWithQuestions};
pub use referral::{PatientReferral, ReferralReward};
pub use session::{AuthSession, CalendarCredentials};
pub use user::User;
