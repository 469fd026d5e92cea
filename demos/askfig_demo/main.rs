//! # askfig demo application
//!
//! A sample deploy tool that shows how askfig fills in whatever the command
//! line and config files leave open. Not a real app.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example askfig_demo -- deploy --target prod
//! cargo run --example askfig_demo -- build --release
//! cargo run --example askfig_demo
//! ```
//!
//! | Feature                  | How to exercise it                                          |
//! |--------------------------|-------------------------------------------------------------|
//! | Asking for a subcommand  | run with no arguments                                       |
//! | Asking for a value       | `deploy` without `--target`                                 |
//! | Shared field asked once  | `--jobs` belongs to both `build` and `deploy`               |
//! | Config file (cwd)        | `[Deploy]\ntarget = "staging"` in `askfig-demo.toml`        |
//! | Env var                  | `ASKFIG_DEMO__DEPLOY__REGION=eu cargo run ... -- deploy`    |
//! | Selection + validation   | `region` must be one of `us`, `eu`, `ap`                    |
//! | Secret                   | `token` is masked; type `:show` to reveal                   |
//! | Cancel                   | `:q` or Ctrl-D at any prompt, exit code 1                   |

use serde::Deserialize;

use askfig::check::{one_of, range};
use askfig::{
    Askfig, CellKind, Describe, Field, Schema, SearchPath, SecretSpec, SelectSpec, Target,
    TextProvider, TypeTag,
};

#[derive(Debug, Deserialize)]
enum Demo {
    Build {
        jobs: i64,
        release: bool,
    },
    Deploy {
        jobs: i64,
        target: String,
        region: String,
        token: Option<String>,
    },
}

impl Describe for Demo {
    fn describe() -> Target {
        let common = Schema::new("Common").field(
            Field::new("jobs", TypeTag::Int)
                .doc("Parallel jobs.")
                .validator(range(Some(1.0), Some(64.0))),
        );
        let build = Schema::new("Build")
            .doc("Build the project.")
            .field(Field::new("release", TypeTag::Bool).default(false))
            .extends(&common);
        let deploy = Schema::new("Deploy")
            .doc("Ship a build.")
            .field(Field::new("target", TypeTag::Str).doc("Environment name."))
            .field(
                Field::new("region", TypeTag::Str)
                    .default("us")
                    .cell_kind(CellKind::Select(SelectSpec::from_labels(["us", "eu", "ap"])))
                    .validator(one_of(["us", "eu", "ap"])),
            )
            .field(
                Field::new("token", TypeTag::optional(TypeTag::Str))
                    .cell_kind(CellKind::Secret(SecretSpec::default())),
            )
            .extends(&common);
        Target::Candidates(vec![build, deploy])
    }
}

fn main() {
    let result = Askfig::builder()
        .app_name("askfig-demo")
        .env_prefix("ASKFIG_DEMO")
        .add_search_path(SearchPath::Cwd)
        .args(std::env::args().skip(1))
        .title("A few more details")
        .run::<Demo, _>(TextProvider::stdio());

    match result {
        Ok(outcome) => {
            let code = outcome.exit_code();
            if let Some(demo) = outcome.resolved() {
                println!("{demo:#?}");
            } else {
                eprintln!("cancelled");
            }
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}
