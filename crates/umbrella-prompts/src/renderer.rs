//! Template rendering for stage prompts.
//!
//! Every template in the file is compiled up front; a template that does not
//! compile fails construction rather than a later request. Output is never
//! HTML-escaped: prompts are plain text and submissions must reach the
//! inference service exactly as written.

use handlebars::Handlebars;
use serde_json::Value;

use crate::templates::TemplatesFile;
use crate::PromptError;

/// Which half of a template to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    System,
    User,
}

impl Part {
    fn suffix(&self) -> &'static str {
        match self {
            Part::System => "system",
            Part::User => "user",
        }
    }
}

/// Compiled renderer over one templates file
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
    templates: TemplatesFile,
}

impl PromptRenderer {
    pub fn new(templates: TemplatesFile) -> Result<Self, PromptError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, partial) in &templates.partials {
            handlebars
                .register_partial(name, partial)
                .map_err(|e| PromptError::Compile {
                    name: name.clone(),
                    detail: e.to_string(),
                })?;
        }

        for (name, template) in &templates.templates {
            let parts = [
                (Part::System, Some(&template.system)),
                (Part::User, template.user.as_ref()),
            ];
            for (part, source) in parts {
                let Some(source) = source else { continue };
                let compiled = compiled_name(name, part);
                handlebars
                    .register_template_string(&compiled, source)
                    .map_err(|e| PromptError::Compile {
                        name: compiled.clone(),
                        detail: e.to_string(),
                    })?;
            }
        }

        Ok(PromptRenderer {
            handlebars,
            templates,
        })
    }

    /// Whether `name` has the given part
    pub fn has(&self, name: &str, part: Part) -> bool {
        self.handlebars.has_template(&compiled_name(name, part))
    }

    pub fn render(&self, name: &str, part: Part, data: &Value) -> Result<String, PromptError> {
        let compiled = compiled_name(name, part);
        if !self.handlebars.has_template(&compiled) {
            return Err(PromptError::MissingTemplate(compiled));
        }
        self.handlebars
            .render(&compiled, data)
            .map(|rendered| rendered.trim_end().to_string())
            .map_err(|e| PromptError::Render {
                name: compiled,
                detail: e.to_string(),
            })
    }

    /// List available template names
    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.list_templates()
    }

    pub fn version(&self) -> &str {
        &self.templates.version
    }
}

fn compiled_name(name: &str, part: Part) -> String {
    format!("{}.{}", name, part.suffix())
}
