// Decision engine: exclusions, reply parsing and the verdict state machine

pub mod decision;
pub mod exclusions;
pub mod reply_parser;

pub use decision::DecisionService;
pub use exclusions::ExclusionRules;
pub use reply_parser::{parse_reply, ParsedReply};
