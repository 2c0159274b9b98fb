pub mod convert;
pub mod log;
pub mod progress;
pub mod render;
pub mod session;

pub use convert::{ConvertRequest, Converter};
pub use progress::{reduce, Outcome, Phase, ProgressState, Terminal};
pub use session::{Epoch, Session, Update};
pub use synctify_model as model;
pub use synctify_persist as persist;
pub use synctify_reader as reader;

pub const SPLASH_LOGO: &str = r#"
   ____ __  ___  __ _____________________  __
  / __/ \ \/ / |/ / ___/_  __/  _/ __/\ \/ /
 _\ \    \  /    / /__  / / _/ // _/   \  /
/___/    /_/_/|_/\___/ /_/ /___/_/     /_/
"#;
