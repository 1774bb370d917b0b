//! Property checks over a corpus of expressions and the fixture templates.
//!
//! Run with: cargo test --test invariants

mod expressions;
mod templates;

use libtest_mimic::{Arguments, Trial};

fn main() {
    let args = Arguments::from_args();

    let mut trials = Vec::new();
    trials.extend(expressions::trials());
    trials.extend(templates::trials());

    libtest_mimic::run(&args, trials).exit();
}
