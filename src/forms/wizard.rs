use super::{FieldError, FormError, FormState};

/// One page of a wizard and the fields it collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub title: &'static str,
    pub fields: &'static [&'static str],
}

/// A form that can be filled in ordered steps.
pub trait WizardForm: FormState {
    fn steps() -> &'static [Step];
}

/// Walks an operator through a form one step at a time.
///
/// Moving forward requires the current step to be free of errors; moving
/// back never does.
#[derive(Debug, Clone)]
pub struct Wizard<S> {
    form: S,
    current: usize,
}

impl<S: WizardForm> Wizard<S> {
    pub fn new(form: S) -> Self {
        Self { form, current: 0 }
    }

    pub fn current_step(&self) -> &'static Step {
        &S::steps()[self.current]
    }

    pub fn position(&self) -> (usize, usize) {
        (self.current + 1, S::steps().len())
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= S::steps().len()
    }

    pub fn form(&self) -> &S {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut S {
        &mut self.form
    }

    /// Errors on fields that belong to the current step.
    pub fn step_errors(&self) -> Vec<FieldError> {
        let fields = self.current_step().fields;
        self.form
            .validate()
            .into_iter()
            .filter(|e| fields.contains(&e.field.as_str()))
            .collect()
    }

    /// Advance one step. `Ok(false)` means the last step is done.
    pub fn next(&mut self) -> Result<bool, FormError> {
        let errors = self.step_errors();
        if !errors.is_empty() {
            return Err(FormError::Incomplete(errors));
        }
        if self.is_last() {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    /// Go back one step. Returns false on the first step.
    pub fn back(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Hand back the form once every step validates.
    pub fn finish(self) -> Result<S, FormError> {
        let errors = self.form.validate();
        if !errors.is_empty() {
            return Err(FormError::Incomplete(errors));
        }
        Ok(self.form)
    }
}
