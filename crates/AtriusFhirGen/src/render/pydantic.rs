use super::Renderer;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::format_helpers::{format_cardinality, python_docstring, python_string_literal};
use crate::naming::Naming;
use atrius_fhir_model::{ClassModel, EnumModel, GeneratedModel, PropertyModel, ValidationRule};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::Write;

const HEADER: &str = include_str!("../../resources/pydantic_header.py");
const FOOTER: &str = include_str!("../../resources/pydantic_footer.py");
const REFERENCE_CLASS_MARKER: &str = "__REFERENCE_CLASS__";

/// Renders the model as a single Python module of pydantic (v1) classes.
///
/// The module starts with the hand-written support code (the abstract roots, the
/// primitive constraints and the validator factories), then every enum, then every
/// class in render order, and ends with the registry of resource types.
pub struct PydanticRenderer {
    config: GeneratorConfig,
    generated_at: Option<DateTime<Utc>>,
}

impl PydanticRenderer {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            generated_at: None,
        }
    }

    /// Stamps the module docstring with a generation time.
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    fn module_docstring(&self, model: &GeneratedModel) -> String {
        let mut text = String::from("Generated FHIR data model.");
        if let Some(url) = &self.config.specification_url {
            text.push_str(&format!("\n\nSource: {}", url));
        }
        if let Some(version) = &model.fhir_version {
            text.push_str(&format!("\nFHIR version: {}", version));
        }
        if let Some(at) = self.generated_at {
            text.push_str(&format!("\nGenerated at: {}", at.to_rfc3339()));
        }
        python_docstring(&text, 0)
    }
}

/// Names that need quoting because they are defined later in the module.
struct Forward<'a> {
    classes: HashSet<&'a str>,
    has_element: bool,
}

impl<'a> Forward<'a> {
    fn new(model: &'a GeneratedModel) -> Self {
        let classes: HashSet<&str> = model.classes.iter().map(|c| c.name.as_str()).collect();
        let has_element = classes.contains("Element");
        Self {
            classes,
            has_element,
        }
    }
}

fn property_doc(property: &PropertyModel) -> String {
    let mut doc = property.short.clone().unwrap_or_default();
    if !doc.is_empty() && !doc.ends_with('.') {
        doc.push('.');
    }
    if !doc.is_empty() {
        doc.push(' ');
    }
    doc.push_str(&format_cardinality(&property.cardinality));
    if !property.restricted_to.is_empty() {
        doc.push_str(&format!(
            ". Allowed codes: {}",
            property.restricted_to.join(", ")
        ));
    }
    doc
}

impl Renderer for PydanticRenderer {
    fn file_name(&self) -> &str {
        &self.config.output_file
    }

    fn render(&self, model: &GeneratedModel, out: &mut dyn Write) -> Result<()> {
        let naming = Naming::new(&self.config);
        let forward = Forward::new(model);

        out.write_all(self.module_docstring(model).as_bytes())?;
        writeln!(out)?;
        out.write_all(HEADER.as_bytes())?;

        for enumeration in &model.enums {
            render_enum(enumeration, &naming, out)?;
        }
        for class in &model.classes {
            render_class(class, &naming, &forward, out)?;
        }

        let reference_class = model
            .reference_class
            .as_deref()
            .filter(|name| forward.classes.contains(name));
        match reference_class {
            Some(name) => {
                let name = naming.replaced_class_name(name);
                out.write_all(FOOTER.replace(REFERENCE_CLASS_MARKER, &name).as_bytes())?;
            }
            None => {
                // Without a reference class there is nothing to attach the check to.
                let footer = FOOTER
                    .lines()
                    .take_while(|line| !line.starts_with("for _subclass in {"))
                    .collect::<Vec<_>>()
                    .join("\n");
                out.write_all(footer.as_bytes())?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

fn render_enum(enumeration: &EnumModel, naming: &Naming, out: &mut dyn Write) -> Result<()> {
    writeln!(out)?;
    writeln!(out)?;
    writeln!(
        out,
        "class {}(str, DocEnum):",
        naming.replaced_class_name(&enumeration.name)
    )?;
    let doc = match &enumeration.definition {
        Some(definition) => format!("{}\n\nSystem: {}", definition, enumeration.system),
        None => format!("System: {}", enumeration.system),
    };
    write!(out, "{}", python_docstring(&doc, 4))?;
    writeln!(out)?;
    for value in &enumeration.values {
        writeln!(
            out,
            "    {} = {}, {}",
            value.name,
            python_string_literal(&value.code),
            python_string_literal(&value.doc)
        )?;
    }
    Ok(())
}

fn python_type(property: &PropertyModel, naming: &Naming, forward: &Forward) -> String {
    let base = match &property.enum_name {
        Some(enum_name) => naming.replaced_class_name(enum_name),
        None => {
            let name = naming.replaced_class_name(&property.type_name);
            if forward.classes.contains(property.type_name.as_str()) {
                format!("\"{}\"", name)
            } else {
                name
            }
        }
    };
    if !property.is_list() {
        return base;
    }
    if property.is_primitive {
        // Null positions line up primitive values with their extensions.
        format!("typing.List[typing.Optional[{}]]", base)
    } else {
        format!("typing.List[{}]", base)
    }
}

fn companion_type(property: &PropertyModel, forward: &Forward) -> String {
    let element = if forward.has_element {
        "\"Element\""
    } else {
        "dict"
    };
    if property.is_list() {
        format!("typing.List[typing.Optional[{}]]", element)
    } else {
        element.to_string()
    }
}

fn render_field(
    property: &PropertyModel,
    naming: &Naming,
    forward: &Forward,
    out: &mut dyn Write,
) -> Result<()> {
    let field = naming.safe_property_name(&property.name);
    let ty = python_type(property, naming, forward);
    let alias = python_string_literal(&property.name);
    if property.is_required() {
        writeln!(out, "    {}: {} = pydantic.Field(..., alias={})", field, ty, alias)?;
    } else {
        writeln!(
            out,
            "    {}: typing.Optional[{}] = pydantic.Field(None, alias={})",
            field, ty, alias
        )?;
    }
    write!(out, "{}", python_docstring(&property_doc(property), 4))?;

    if let Some(companion) = property.companion_key() {
        writeln!(
            out,
            "    {}__ext: typing.Optional[{}] = pydantic.Field(None, alias={})",
            field,
            companion_type(property, forward),
            python_string_literal(&companion)
        )?;
    }
    Ok(())
}

fn quoted_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(python_string_literal).collect::<Vec<_>>().join(", ")
}

fn render_validators(class: &ClassModel, naming: &Naming, out: &mut dyn Write) -> Result<bool> {
    let mut written = false;

    let singletons: Vec<&str> = class
        .properties
        .iter()
        .filter(|p| p.has_rule(&ValidationRule::SingletonNotList))
        .map(|p| p.name.as_str())
        .collect();
    if !singletons.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "    _singletons = pydantic.root_validator(pre=True, allow_reuse=True)(\n        singleton_validator([{}], \"{}_singletons\")\n    )",
            quoted_list(singletons.into_iter()),
            class.name
        )?;
        written = true;
    }

    let paired: Vec<&str> = class
        .properties
        .iter()
        .filter(|p| p.has_rule(&ValidationRule::PrimitiveExtensionPairing))
        .map(|p| p.name.as_str())
        .collect();
    if !paired.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "    _primitive_extensions = pydantic.root_validator(pre=True, allow_reuse=True)(\n        primitive_extension_validator([{}], \"{}_primitive_extensions\")\n    )",
            quoted_list(paired.into_iter()),
            class.name
        )?;
        written = true;
    }

    for group in &class.choice_groups {
        let members: Vec<String> = group
            .member_names()
            .map(|name| naming.safe_property_name(name))
            .collect();
        let validator = naming.safe_property_name(&group.name);
        writeln!(out)?;
        writeln!(
            out,
            "    _{}_choice = pydantic.root_validator(allow_reuse=True)(\n        choice_of_validator({{{}}}, {}, \"{}_{}_choice\")\n    )",
            validator,
            quoted_list(members.iter().map(String::as_str)),
            if group.required { "False" } else { "True" },
            class.name,
            validator
        )?;
        written = true;
    }
    Ok(written)
}

fn render_class(
    class: &ClassModel,
    naming: &Naming,
    forward: &Forward,
    out: &mut dyn Write,
) -> Result<()> {
    let name = naming.replaced_class_name(&class.name);
    let superclass = naming.replaced_class_name(class.superclass.as_deref().unwrap_or_default());

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "class {}({}):", name, superclass)?;
    let doc = match (&class.short, &class.definition) {
        (Some(short), Some(definition)) if short != definition => {
            format!("{}\n\n{}", short, definition)
        }
        (Some(text), _) | (None, Some(text)) => text.clone(),
        (None, None) => class.fhir_name.clone(),
    };
    write!(out, "{}", python_docstring(&doc, 4))?;

    if let Some(resource_type) = class.resource_type() {
        writeln!(out)?;
        writeln!(
            out,
            "    resource_type: typing.ClassVar[str] = {}",
            python_string_literal(resource_type)
        )?;
    }

    if !class.properties.is_empty() {
        writeln!(out)?;
    }
    for property in &class.properties {
        render_field(property, naming, forward, out)?;
    }
    render_validators(class, naming, out)?;
    Ok(())
}
