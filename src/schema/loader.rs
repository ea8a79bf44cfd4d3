//! Class declaration loader
//!
//! Reads `*.json` class declarations from a directory. A file holds one
//! class object or an array of them:
//!
//! ```json
//! {
//!   "name": "Signup",
//!   "parent": "Account",
//!   "fields": [
//!     {"name": "email", "type": "string", "validators": ["email"]},
//!     {"name": "tags", "type": {"list": "string"}, "required": false},
//!     {"name": "address", "type": {"object": "Address"}},
//!     {"name": "age", "type": "int", "validators": [{"kind": "range", "ge": 0}]},
//!     {"name": "span", "type": {"tuple": ["date", {"nullable": "date"}]}},
//!     {"name": "level", "type": {"enum": {"name": "Level", "members": [["LOW", 1], ["HIGH", 2]]}}}
//!   ]
//! }
//! ```
//!
//! Parents and nested classes are referenced by name and linked once every
//! file is read. Unknown names and cycles fail the whole load.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as Json;

use super::errors::{ConfigResult, ConfigurationError};
use super::types::{ClassSpec, EnumSpec, FieldSpec, TypeTag, ValidatorRef};
use crate::validation::{BuiltinDecl, ErrorCode};

/// One class as written on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// One field as written on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_decl: TypeDecl,
    /// Fields are required unless declared otherwise
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Json>,
    #[serde(default)]
    pub binder_options: BTreeMap<String, Json>,
    #[serde(default)]
    pub validators: Vec<ValidatorDecl>,
    #[serde(default)]
    pub error_codes: HashMap<String, String>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

fn default_required() -> bool {
    true
}

/// Declared type: a scalar name or a single-key object naming a composite,
/// e.g. `{"list": <type>}`, `{"object": "<class>"}`, `{"union": [<type>, ...]}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDecl {
    String,
    Int,
    Float,
    Bool,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Any,
    List(Box<TypeDecl>),
    Tuple(Vec<TypeDecl>),
    TupleOf(Box<TypeDecl>),
    Union(Vec<TypeDecl>),
    Nullable(Box<TypeDecl>),
    Enum(EnumDecl),
    Object(String),
}

/// Enumeration members as ordered `[name, value]` pairs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<(String, Json)>,
}

/// A validator symbol or an inline built-in
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ValidatorDecl {
    Symbol(String),
    Builtin(BuiltinDecl),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeclFile {
    One(ClassDecl),
    Many(Vec<ClassDecl>),
}

/// Loads class declarations and links them into shared `ClassSpec`s.
#[derive(Debug)]
pub struct ClassSpecLoader {
    spec_dir: PathBuf,
    /// Declarations by class name, with the source they came from
    decls: BTreeMap<String, (String, ClassDecl)>,
    classes: HashMap<String, Arc<ClassSpec>>,
}

impl ClassSpecLoader {
    pub fn new(spec_dir: &Path) -> Self {
        Self {
            spec_dir: spec_dir.to_path_buf(),
            decls: BTreeMap::new(),
            classes: HashMap::new(),
        }
    }

    pub fn spec_dir(&self) -> &Path {
        &self.spec_dir
    }

    /// Reads every `*.json` file in the directory and links the result.
    ///
    /// Returns the number of linked classes.
    pub fn load_all(&mut self) -> ConfigResult<usize> {
        let dir = self.spec_dir.display().to_string();
        let entries = fs::read_dir(&self.spec_dir).map_err(|e| {
            let reason = format!("Failed to read directory: {}", e);
            ConfigurationError::malformed_declaration(&dir, reason)
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ConfigurationError::malformed_declaration(
                    &dir,
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory order is unspecified
        paths.sort();

        for path in paths {
            let source = path.display().to_string();
            let content = fs::read_to_string(&path).map_err(|e| {
                let reason = format!("Failed to read file: {}", e);
                ConfigurationError::malformed_declaration(&source, reason)
            })?;
            self.add_json(&source, &content)?;
        }

        self.link()?;
        Ok(self.classes.len())
    }

    /// Parses one declaration document. Call `link` afterwards.
    pub fn add_json(&mut self, source: &str, content: &str) -> ConfigResult<()> {
        let file: DeclFile = serde_json::from_str(content).map_err(|e| {
            ConfigurationError::malformed_declaration(source, format!("Invalid declaration: {}", e))
        })?;
        let decls = match file {
            DeclFile::One(decl) => vec![decl],
            DeclFile::Many(decls) => decls,
        };
        for decl in decls {
            self.add_declaration(source, decl)?;
        }
        Ok(())
    }

    /// Adds a parsed declaration. Class names are unique across sources.
    pub fn add_declaration(&mut self, source: &str, decl: ClassDecl) -> ConfigResult<()> {
        if decl.name.is_empty() {
            return Err(ConfigurationError::malformed_declaration(
                source,
                "class name cannot be empty",
            ));
        }
        if self.decls.contains_key(&decl.name) {
            return Err(ConfigurationError::duplicate_class(&decl.name));
        }
        self.decls.insert(decl.name.clone(), (source.to_string(), decl));
        Ok(())
    }

    /// Links every declaration, replacing previously linked classes.
    pub fn link(&mut self) -> ConfigResult<()> {
        let mut linker = Linker {
            decls: &self.decls,
            linked: HashMap::new(),
            visiting: Vec::new(),
        };
        for name in self.decls.keys() {
            linker.class(name)?;
        }
        self.classes = linker.linked;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassSpec>> {
        self.classes.get(name).cloned()
    }

    /// Like `get`, but a missing class is an error.
    pub fn require(&self, name: &str) -> ConfigResult<Arc<ClassSpec>> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::unknown_class(name))
    }

    /// Linked class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

struct Linker<'d> {
    decls: &'d BTreeMap<String, (String, ClassDecl)>,
    linked: HashMap<String, Arc<ClassSpec>>,
    visiting: Vec<String>,
}

impl Linker<'_> {
    fn class(&mut self, name: &str) -> ConfigResult<Arc<ClassSpec>> {
        if let Some(class) = self.linked.get(name) {
            return Ok(class.clone());
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(ConfigurationError::inheritance_cycle(name));
        }
        let decls = self.decls;
        let (source, decl) = decls
            .get(name)
            .ok_or_else(|| ConfigurationError::unknown_class(name))?;

        self.visiting.push(name.to_string());
        let mut class = ClassSpec::new(name);
        if let Some(parent) = &decl.parent {
            class = class.extends(self.class(parent)?);
        }
        for field in &decl.fields {
            class = class.field(self.field(source, field)?);
        }
        self.visiting.pop();

        class.validate_structure()?;
        let class = Arc::new(class);
        self.linked.insert(name.to_string(), class.clone());
        Ok(class)
    }

    fn field(&mut self, source: &str, decl: &FieldDecl) -> ConfigResult<FieldSpec> {
        if decl.name.is_empty() {
            return Err(ConfigurationError::malformed_declaration(
                source,
                "field name cannot be empty",
            ));
        }
        let declared_type = self.type_tag(&decl.type_decl)?;
        let mut field = if decl.required {
            FieldSpec::required(&decl.name, declared_type)
        } else {
            FieldSpec::optional(&decl.name, declared_type)
        };
        field.default = decl.default.clone();
        field.binder_options = decl.binder_options.clone();
        field.validators = decl
            .validators
            .iter()
            .map(|v| match v {
                ValidatorDecl::Symbol(symbol) => Ok(ValidatorRef::symbol(symbol)),
                ValidatorDecl::Builtin(builtin) => builtin.build().map(ValidatorRef::Inline),
            })
            .collect::<ConfigResult<_>>()?;
        field.error_codes = decl
            .error_codes
            .iter()
            .map(|(key, code)| (key.clone(), ErrorCode::new(code)))
            .collect();
        field.messages = decl.messages.clone();
        Ok(field)
    }

    fn type_tag(&mut self, decl: &TypeDecl) -> ConfigResult<TypeTag> {
        Ok(match decl {
            TypeDecl::String => TypeTag::String,
            TypeDecl::Int => TypeTag::Int,
            TypeDecl::Float => TypeTag::Float,
            TypeDecl::Bool => TypeTag::Bool,
            TypeDecl::Date => TypeTag::Date,
            TypeDecl::DateTime => TypeTag::DateTime,
            TypeDecl::Any => TypeTag::Any,
            TypeDecl::List(element) => TypeTag::list_of(self.type_tag(element)?),
            TypeDecl::Tuple(slots) => TypeTag::Tuple(self.type_tags(slots)?),
            TypeDecl::TupleOf(element) => TypeTag::tuple_of(self.type_tag(element)?),
            TypeDecl::Union(alternatives) => TypeTag::Union(self.type_tags(alternatives)?),
            TypeDecl::Nullable(inner) => TypeTag::nullable(self.type_tag(inner)?),
            TypeDecl::Enum(decl) => decl
                .members
                .iter()
                .fold(EnumSpec::new(&decl.name), |spec, (name, value)| {
                    spec.member(name, value.clone())
                })
                .into_type(),
            TypeDecl::Object(class) => TypeTag::Object(self.class(class)?),
        })
    }

    fn type_tags(&mut self, decls: &[TypeDecl]) -> ConfigResult<Vec<TypeTag>> {
        decls.iter().map(|decl| self.type_tag(decl)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader_with(docs: &[&str]) -> ConfigResult<ClassSpecLoader> {
        let mut loader = ClassSpecLoader::new(Path::new("<memory>"));
        for (i, doc) in docs.iter().enumerate() {
            loader.add_json(&format!("doc{}", i), doc)?;
        }
        loader.link()?;
        Ok(loader)
    }

    #[test]
    fn test_load_all_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("account.json"),
            r#"{"name": "Account", "fields": [
                {"name": "email", "type": "string", "validators": ["email"]},
                {"name": "password", "type": "string",
                 "validators": [{"kind": "password", "min_length": 10}]}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("invite.json"),
            r#"{"name": "Invite", "parent": "Account", "fields": [
                {"name": "password", "type": "string", "required": false}
            ]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = ClassSpecLoader::new(dir.path());
        assert_eq!(loader.load_all().unwrap(), 2);
        assert_eq!(loader.class_names(), vec!["Account", "Invite"]);

        let invite = loader.get("Invite").unwrap();
        assert_eq!(invite.parent().unwrap().name(), "Account");
        assert!(!invite.fields()[0].required);
        assert!(invite.fields()[0].validators.is_empty());

        let account = loader.get("Account").unwrap();
        assert_eq!(account.fields()[0].validators[0].key(), "email");
        assert_eq!(account.fields()[1].validators[0].key(), "password");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let mut loader = ClassSpecLoader::new(&dir.path().join("absent"));
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_MALFORMED_DECLARATION");
    }

    #[test]
    fn test_nested_and_list_types() {
        let loader = loader_with(&[r#"[
            {"name": "Address", "fields": [{"name": "city", "type": "string"}]},
            {"name": "Customer", "fields": [
                {"name": "address", "type": {"object": "Address"}},
                {"name": "scores", "type": {"list": "int"}},
                {"name": "seen", "type": {"list": "datetime"},
                 "binder_options": {"format": "%d/%m/%Y %H:%M"}}
            ]}
        ]"#])
        .unwrap();

        let customer = loader.get("Customer").unwrap();
        match &customer.fields()[0].declared_type {
            TypeTag::Object(address) => assert_eq!(address.name(), "Address"),
            other => panic!("expected object, got {:?}", other),
        }
        match &customer.fields()[1].declared_type {
            TypeTag::List(element) => assert!(matches!(**element, TypeTag::Int)),
            other => panic!("expected list, got {:?}", other),
        }
        assert!(customer.fields()[2].declared_type.uses_format());
    }

    #[test]
    fn test_composite_types() {
        let loader = loader_with(&[r#"{"name": "Booking", "fields": [
            {"name": "span", "type": {"tuple": ["date", {"nullable": "date"}]}},
            {"name": "codes", "type": {"tuple_of": "int"}},
            {"name": "ref", "type": {"union": ["int", "string"]}},
            {"name": "level", "type":
                {"enum": {"name": "Level", "members": [["LOW", 1], ["HIGH", 2]]}}}
        ]}"#])
        .unwrap();

        let booking = loader.require("Booking").unwrap();
        let fields = booking.fields();
        let names: Vec<_> = fields.iter().map(|f| f.declared_type.type_name()).collect();
        assert_eq!(names, vec!["tuple", "tuple_of", "union", "enum"]);
        match &fields[0].declared_type {
            TypeTag::Tuple(slots) => {
                assert!(matches!(slots[0], TypeTag::Date));
                assert!(matches!(
                    &slots[1],
                    TypeTag::Nullable(inner) if matches!(**inner, TypeTag::Date)
                ));
            }
            other => panic!("expected tuple, got {:?}", other),
        }
        assert!(matches!(
            &fields[1].declared_type,
            TypeTag::TupleOf(element) if matches!(**element, TypeTag::Int)
        ));
        match &fields[2].declared_type {
            TypeTag::Union(alternatives) => {
                assert!(matches!(&alternatives[..], [TypeTag::Int, TypeTag::String]))
            }
            other => panic!("expected union, got {:?}", other),
        }
        match &fields[3].declared_type {
            TypeTag::Enum(level) => {
                assert_eq!(level.name(), "Level");
                assert_eq!(level.select(&serde_json::json!(2)), Some("HIGH"));
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_union_rejected() {
        let err = loader_with(&[
            r#"{"name": "A", "fields": [{"name": "x", "type": {"union": []}}]}"#,
        ])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_INVALID_TYPE");
    }

    #[test]
    fn test_enum_repeated_value_rejected() {
        let err = loader_with(&[r#"{"name": "A", "fields": [{"name": "x", "type":
            {"enum": {"name": "E", "members": [["A", 1], ["B", 1]]}}}]}"#])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_INVALID_TYPE");
    }

    #[test]
    fn test_unknown_parent() {
        let err = loader_with(&[r#"{"name": "Invite", "parent": "Ghost"}"#]).unwrap_err();
        assert_eq!(err, ConfigurationError::unknown_class("Ghost"));
    }

    #[test]
    fn test_unknown_nested_class() {
        let err = loader_with(&[
            r#"{"name": "Customer", "fields": [{"name": "a", "type": {"object": "Nowhere"}}]}"#,
        ])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_UNKNOWN_CLASS");
    }

    #[test]
    fn test_inheritance_cycle() {
        let err = loader_with(&[
            r#"{"name": "A", "parent": "B"}"#,
            r#"{"name": "B", "parent": "A"}"#,
        ])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_INHERITANCE_CYCLE");
    }

    #[test]
    fn test_self_referencing_object_is_cycle() {
        let err = loader_with(&[
            r#"{"name": "Node", "fields": [{"name": "next", "type": {"object": "Node"}}]}"#,
        ])
        .unwrap_err();
        assert_eq!(err, ConfigurationError::inheritance_cycle("Node"));
    }

    #[test]
    fn test_duplicate_class() {
        let err = loader_with(&[r#"{"name": "A"}"#, r#"{"name": "A"}"#]).unwrap_err();
        assert_eq!(err, ConfigurationError::duplicate_class("A"));
    }

    #[test]
    fn test_duplicate_field() {
        let err = loader_with(&[
            r#"{"name": "A", "fields": [
                {"name": "x", "type": "int"},
                {"name": "x", "type": "string"}
            ]}"#,
        ])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_DUPLICATE_FIELD");
    }

    #[test]
    fn test_unknown_type_name_is_malformed() {
        let err = loader_with(&[r#"{"name": "A", "fields": [{"name": "x", "type": "decimal"}]}"#])
            .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_MALFORMED_DECLARATION");
    }

    #[test]
    fn test_bad_inline_pattern() {
        let err = loader_with(&[
            r#"{"name": "A", "fields": [{"name": "x", "type": "string",
                "validators": [{"kind": "pattern", "regex": "("}]}]}"#,
        ])
        .unwrap_err();
        assert_eq!(err.code(), "BIND_CONFIG_INVALID_PATTERN");
    }

    #[test]
    fn test_overrides_carried_through() {
        let loader = loader_with(&[r#"{"name": "A", "fields": [{
            "name": "email", "type": "string",
            "error_codes": {"required": "signup.email_missing"},
            "messages": {"required": "we need an e-mail"},
            "default": "nobody@example.com"
        }]}"#])
        .unwrap();
        let a = loader.require("A").unwrap();
        let field = &a.fields()[0];
        assert_eq!(field.error_codes["required"], ErrorCode::new("signup.email_missing"));
        assert_eq!(field.messages["required"], "we need an e-mail");
        assert!(field.is_optional());
    }

    #[test]
    fn test_require_unknown() {
        let loader = loader_with(&[]).unwrap();
        assert_eq!(loader.require("Nope").unwrap_err(), ConfigurationError::unknown_class("Nope"));
    }
}
