pub mod claude;
pub mod error;
pub mod gemini;
pub mod schema;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use gemini::Gemini;
pub use schema::StructuredOutput;
pub use traits::{GroundingSource, JsonRequest, JsonResponse, StructuredAgent};
pub use util::{extract_json_text, strip_code_blocks, truncate_to_char_boundary};
