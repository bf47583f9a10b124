//! Line-based prompts for the onboarding wizards.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};

use crate::forms::{Wizard, WizardForm};

/// Typed on its own to return to the previous step.
const BACK: &str = "<";

/// Drive a wizard from stdin until every step validates.
///
/// Enter keeps the current value, `-` clears it and `<` goes back a step.
pub fn run_wizard<S: WizardForm>(wizard: &mut Wizard<S>) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    'steps: loop {
        let step = wizard.current_step();
        let (n, total) = wizard.position();
        println!();
        println!("[{}/{}] {}", n, total, step.title);

        for field in step.fields {
            let current = wizard.form().value(field).unwrap_or_default().to_string();
            if current.is_empty() {
                print!("  {}: ", field);
            } else {
                print!("  {} [{}]: ", field, current);
            }
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                bail!("Input closed before the form was complete");
            };
            let input = line?;
            match input.trim() {
                "" => {}
                BACK => {
                    wizard.back();
                    continue 'steps;
                }
                "-" => wizard.form_mut().update(field, "")?,
                value => wizard.form_mut().update(field, value)?,
            }
        }

        match wizard.next() {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                for error in e.field_errors() {
                    println!("  ! {}", error);
                }
            }
        }
    }
}
