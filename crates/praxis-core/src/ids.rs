//! ID prefix constants.
//!
//! Every row id is `"{prefix}-{8 hex chars}"`, generated by the database
//! (`PraxisDb::generate_id`). The prefix makes ids self-describing in logs,
//! audit entries and URLs.

pub const PREFIX_USER: &str = "usr";
pub const PREFIX_SESSION: &str = "ses";
pub const PREFIX_RESET_TOKEN: &str = "rst";
pub const PREFIX_OAUTH_STATE: &str = "oas";
pub const PREFIX_PATIENT: &str = "pat";
pub const PREFIX_LEAD: &str = "led";
pub const PREFIX_INDICATION: &str = "ind";
pub const PREFIX_PAGE: &str = "pag";
pub const PREFIX_BLOCK: &str = "blk";
pub const PREFIX_SOCIAL_LINK: &str = "soc";
pub const PREFIX_ADDRESS: &str = "adr";
pub const PREFIX_INTEREST: &str = "int";
pub const PREFIX_PIPELINE: &str = "pip";
pub const PREFIX_CHATBOT_FLOW: &str = "cbf";
pub const PREFIX_CHATBOT_NODE: &str = "cbn";
pub const PREFIX_CHATBOT_EDGE: &str = "cbe";
pub const PREFIX_QUIZ: &str = "qiz";
pub const PREFIX_QUESTION: &str = "qst";
pub const PREFIX_REFERRAL: &str = "ref";
pub const PREFIX_REWARD: &str = "rwd";
pub const PREFIX_EVENT: &str = "evt";
pub const PREFIX_CHECKPOINT: &str = "chk";
pub const PREFIX_HABIT: &str = "hab";
pub const PREFIX_EISENHOWER: &str = "eis";
pub const PREFIX_CLINIC: &str = "cln";
pub const PREFIX_OUTBOUND: &str = "out";
pub const PREFIX_AUDIT: &str = "aud";

/// All prefixes, used by tests to check generator output.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_USER,
    PREFIX_SESSION,
    PREFIX_RESET_TOKEN,
    PREFIX_OAUTH_STATE,
    PREFIX_PATIENT,
    PREFIX_LEAD,
    PREFIX_INDICATION,
    PREFIX_PAGE,
    PREFIX_BLOCK,
    PREFIX_SOCIAL_LINK,
    PREFIX_ADDRESS,
    PREFIX_INTEREST,
    PREFIX_PIPELINE,
    PREFIX_CHATBOT_FLOW,
    PREFIX_CHATBOT_NODE,
    PREFIX_CHATBOT_EDGE,
    PREFIX_QUIZ,
    PREFIX_QUESTION,
    PREFIX_REFERRAL,
    PREFIX_REWARD,
    PREFIX_EVENT,
    PREFIX_CHECKPOINT,
    PREFIX_HABIT,
    PREFIX_EISENHOWER,
    PREFIX_CLINIC,
    PREFIX_OUTBOUND,
    PREFIX_AUDIT,
];
