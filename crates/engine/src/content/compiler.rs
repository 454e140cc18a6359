use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{debug, info};

use crate::AppPaths;

use super::database::{DefDatabase, DefId, HostileArchetype, ItemDef, ItemKind, PlayerDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

const HOSTILE_FIELDS: &[&str] = &[
    "defName",
    "label",
    "maxHealth",
    "strength",
    "defense",
    "speed",
    "attackRange",
    "aggroRange",
    "expValue",
    "spawnWeight",
    "dropChance",
];
const ITEM_FIELDS: &[&str] = &[
    "defName",
    "label",
    "kind",
    "damage",
    "defense",
    "heal",
    "mana",
    "dropWeight",
];
const PLAYER_FIELDS: &[&str] = &[
    "defName",
    "maxHealth",
    "maxMana",
    "strength",
    "defense",
    "speed",
    "manaRegen",
];

#[derive(Debug, Default)]
struct ParsedDefs {
    hostiles: Vec<HostileArchetype>,
    items: Vec<ItemDef>,
    player: Option<PlayerDef>,
}

#[derive(Debug, Default)]
struct MergedDefs {
    hostiles: BTreeMap<String, HostileArchetype>,
    items: BTreeMap<String, ItemDef>,
    player: Option<PlayerDef>,
}

impl MergedDefs {
    // Later files override earlier ones by defName.
    fn merge(&mut self, parsed: ParsedDefs) {
        for def in parsed.hostiles {
            self.hostiles.insert(def.def_name.clone(), def);
        }
        for def in parsed.items {
            self.items.insert(def.def_name.clone(), def);
        }
        if parsed.player.is_some() {
            self.player = parsed.player;
        }
    }

    fn into_database(self) -> DefDatabase {
        DefDatabase::from_defs(
            self.hostiles.into_values().collect(),
            self.items.into_values().collect(),
            self.player,
        )
    }
}

/// Compiles every `*.xml` file under the content directory, in sorted relative-path order.
pub fn compile_def_database(app_paths: &AppPaths) -> Result<DefDatabase, ContentCompileError> {
    let root = &app_paths.content_dir;
    let xml_files = collect_xml_files_sorted(root)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut merged = MergedDefs::default();
    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        let parsed = parse_defs_document(xml_file, &raw)?;
        debug!(
            file = %xml_file.display(),
            hostiles = parsed.hostiles.len(),
            items = parsed.items.len(),
            "defs_file_parsed"
        );
        merged.merge(parsed);
    }

    let database = merged.into_database();
    info!(
        files = xml_files.len(),
        hostiles = database.hostiles().len(),
        items = database.items().len(),
        "def_database_compiled"
    );
    Ok(database)
}

pub fn compile_def_database_from_str(
    file_path: impl AsRef<Path>,
    raw: &str,
) -> Result<DefDatabase, ContentCompileError> {
    let mut merged = MergedDefs::default();
    merged.merge(parse_defs_document(file_path.as_ref(), raw)?);
    Ok(merged.into_database())
}

struct ParseCtx<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl<'a, 'input> ParseCtx<'a, 'input> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'a, 'input>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

fn parse_defs_document(file_path: &Path, raw: &str) -> Result<ParsedDefs, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseCtx {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut parsed = ParsedDefs::default();
    let mut seen_hostiles = HashSet::<String>::new();
    let mut seen_items = HashSet::<String>::new();
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "HostileDef" => {
                let def = parse_hostile_def(&ctx, child)?;
                if !seen_hostiles.insert(def.def_name.clone()) {
                    return Err(duplicate_def(&ctx, "HostileDef", &def.def_name, child));
                }
                parsed.hostiles.push(def);
            }
            "ItemDef" => {
                let def = parse_item_def(&ctx, child)?;
                if !seen_items.insert(def.def_name.clone()) {
                    return Err(duplicate_def(&ctx, "ItemDef", &def.def_name, child));
                }
                parsed.items.push(def);
            }
            "PlayerDef" => {
                if parsed.player.is_some() {
                    return Err(duplicate_def(&ctx, "PlayerDef", "player", child));
                }
                parsed.player = Some(parse_player_def(&ctx, child)?);
            }
            other => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected <HostileDef>, <ItemDef> or <PlayerDef>"
                    ),
                    child,
                ))
            }
        }
    }

    Ok(parsed)
}

fn duplicate_def<'a, 'input>(
    ctx: &ParseCtx<'a, 'input>,
    def_type: &str,
    def_name: &str,
    node: Node<'a, 'input>,
) -> ContentCompileError {
    ctx.error_at(
        ContentErrorCode::DuplicateDef,
        format!("duplicate {def_type} '{def_name}'; each file may define a defName only once"),
        node,
    )
}

/// Field text keyed by tag name, with the node kept for error locations.
struct DefFields<'a, 'input> {
    def_type: &'static str,
    owner: Node<'a, 'input>,
    values: HashMap<&'static str, (String, Node<'a, 'input>)>,
}

fn collect_fields<'a, 'input>(
    ctx: &ParseCtx<'a, 'input>,
    def_type: &'static str,
    node: Node<'a, 'input>,
    allowed: &[&'static str],
) -> Result<DefFields<'a, 'input>, ContentCompileError> {
    let mut values = HashMap::new();
    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name();
        let Some(known) = allowed.iter().copied().find(|name| *name == field_name) else {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!("unknown field <{field_name}> in <{def_type}>"),
                field,
            ));
        };
        let text = field.text().map(str::trim).unwrap_or_default().to_string();
        if text.is_empty() {
            return Err(ctx.error_at(
                ContentErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                field,
            ));
        }
        if values.insert(known, (text, field)).is_some() {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <{def_type}>"),
                field,
            ));
        }
    }
    Ok(DefFields {
        def_type,
        owner: node,
        values,
    })
}

impl<'a, 'input> DefFields<'a, 'input> {
    fn text(&self, ctx: &ParseCtx<'a, 'input>, name: &str) -> Result<String, ContentCompileError> {
        match self.values.get(name) {
            Some((text, _)) => Ok(text.clone()),
            None => Err(ctx.error_at(
                ContentErrorCode::MissingField,
                format!("missing required field <{name}> in <{}>", self.def_type),
                self.owner,
            )),
        }
    }

    fn optional_text(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|(text, _)| text.clone())
    }

    fn number(
        &self,
        ctx: &ParseCtx<'a, 'input>,
        name: &str,
        default: Option<f32>,
    ) -> Result<f32, ContentCompileError> {
        let Some((text, node)) = self.values.get(name) else {
            return default.ok_or_else(|| {
                ctx.error_at(
                    ContentErrorCode::MissingField,
                    format!("missing required field <{name}> in <{}>", self.def_type),
                    self.owner,
                )
            });
        };
        let parsed = text.parse::<f32>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} '{text}' is not a valid number"),
                *node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} must be finite and >= 0"),
                *node,
            ));
        }
        Ok(parsed)
    }

    fn positive(
        &self,
        ctx: &ParseCtx<'a, 'input>,
        name: &str,
    ) -> Result<f32, ContentCompileError> {
        let value = self.number(ctx, name, None)?;
        if value <= 0.0 {
            return Err(self.invalid(ctx, name, format!("{name} must be > 0")));
        }
        Ok(value)
    }

    fn integer(
        &self,
        ctx: &ParseCtx<'a, 'input>,
        name: &str,
        default: Option<u32>,
    ) -> Result<u32, ContentCompileError> {
        let Some((text, node)) = self.values.get(name) else {
            return default.ok_or_else(|| {
                ctx.error_at(
                    ContentErrorCode::MissingField,
                    format!("missing required field <{name}> in <{}>", self.def_type),
                    self.owner,
                )
            });
        };
        text.parse::<u32>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("{name} '{text}' is not a non-negative integer"),
                *node,
            )
        })
    }

    fn invalid(
        &self,
        ctx: &ParseCtx<'a, 'input>,
        name: &str,
        message: String,
    ) -> ContentCompileError {
        let node = self
            .values
            .get(name)
            .map(|(_, node)| *node)
            .unwrap_or(self.owner);
        ctx.error_at(ContentErrorCode::InvalidValue, message, node)
    }
}

fn parse_hostile_def<'a, 'input>(
    ctx: &ParseCtx<'a, 'input>,
    node: Node<'a, 'input>,
) -> Result<HostileArchetype, ContentCompileError> {
    let fields = collect_fields(ctx, "HostileDef", node, HOSTILE_FIELDS)?;
    let def_name = fields.text(ctx, "defName")?;
    let drop_chance = fields.number(ctx, "dropChance", Some(0.0))?;
    if drop_chance > 1.0 {
        return Err(fields.invalid(
            ctx,
            "dropChance",
            "dropChance must be within [0, 1]".to_string(),
        ));
    }

    Ok(HostileArchetype {
        id: DefId(0),
        label: fields.optional_text("label").unwrap_or_else(|| def_name.clone()),
        max_health: fields.positive(ctx, "maxHealth")?,
        strength: fields.integer(ctx, "strength", None)? as i32,
        defense: fields.integer(ctx, "defense", Some(0))? as i32,
        speed: fields.number(ctx, "speed", None)?,
        attack_range: fields.positive(ctx, "attackRange")?,
        aggro_range: fields.positive(ctx, "aggroRange")?,
        exp_value: fields.integer(ctx, "expValue", Some(0))?,
        spawn_weight: fields.integer(ctx, "spawnWeight", Some(1))?,
        drop_chance,
        def_name,
    })
}

fn parse_item_def<'a, 'input>(
    ctx: &ParseCtx<'a, 'input>,
    node: Node<'a, 'input>,
) -> Result<ItemDef, ContentCompileError> {
    let fields = collect_fields(ctx, "ItemDef", node, ITEM_FIELDS)?;
    let def_name = fields.text(ctx, "defName")?;
    let raw_kind = fields.text(ctx, "kind")?;
    let Some(kind) = ItemKind::parse(&raw_kind) else {
        return Err(fields.invalid(
            ctx,
            "kind",
            format!("invalid kind '{raw_kind}'; allowed values: weapon, armor, potion"),
        ));
    };

    Ok(ItemDef {
        id: DefId(0),
        label: fields.optional_text("label").unwrap_or_else(|| def_name.clone()),
        kind,
        damage: fields.integer(ctx, "damage", Some(0))? as i32,
        defense: fields.integer(ctx, "defense", Some(0))? as i32,
        heal: fields.number(ctx, "heal", Some(0.0))?,
        mana: fields.number(ctx, "mana", Some(0.0))?,
        drop_weight: fields.integer(ctx, "dropWeight", Some(1))?,
        def_name,
    })
}

fn parse_player_def<'a, 'input>(
    ctx: &ParseCtx<'a, 'input>,
    node: Node<'a, 'input>,
) -> Result<PlayerDef, ContentCompileError> {
    let fields = collect_fields(ctx, "PlayerDef", node, PLAYER_FIELDS)?;
    let defaults = PlayerDef::default();

    Ok(PlayerDef {
        def_name: fields
            .optional_text("defName")
            .unwrap_or(defaults.def_name),
        max_health: fields.positive(ctx, "maxHealth")?,
        max_mana: fields.number(ctx, "maxMana", Some(defaults.max_mana))?,
        strength: fields.integer(ctx, "strength", Some(defaults.strength as u32))? as i32,
        defense: fields.integer(ctx, "defense", Some(defaults.defense as u32))? as i32,
        speed: fields.number(ctx, "speed", Some(defaults.speed))?,
        mana_regen: fields.number(ctx, "manaRegen", Some(defaults.mana_regen))?,
    })
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: path,
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const GOBLIN: &str = r#"<HostileDef><defName>goblin</defName><maxHealth>50</maxHealth><strength>8</strength><defense>3</defense><speed>100</speed><attackRange>50</attackRange><aggroRange>300</aggroRange><expValue>10</expValue></HostileDef>"#;

    fn setup_app_paths(root: &Path) -> AppPaths {
        let content_dir = root.join("assets").join("base");
        fs::create_dir_all(&content_dir).expect("content dir");
        AppPaths {
            root: root.to_path_buf(),
            content_dir,
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn compile(raw: &str) -> Result<DefDatabase, ContentCompileError> {
        compile_def_database_from_str("defs.xml", raw)
    }

    #[test]
    fn valid_compile_assigns_stable_ids_by_def_name() {
        let db = compile(&format!(
            "<Defs>{}{}</Defs>",
            GOBLIN.replace("goblin", "zeta"),
            GOBLIN.replace("goblin", "alpha")
        ))
        .expect("compile");
        let alpha = db.hostile_id_by_name("alpha").expect("alpha");
        let zeta = db.hostile_id_by_name("zeta").expect("zeta");
        assert!(alpha.0 < zeta.0);
    }

    #[test]
    fn optional_fields_take_defaults() {
        let db = compile(&format!("<Defs>{GOBLIN}</Defs>")).expect("compile");
        let goblin = db.hostile(DefId(0)).expect("goblin");
        assert_eq!(goblin.label, "goblin");
        assert_eq!(goblin.spawn_weight, 1);
        assert_eq!(goblin.drop_chance, 0.0);
        assert_eq!(db.player(), &PlayerDef::default());
    }

    #[test]
    fn missing_field_reports_file_and_location() {
        let err = compile(
            "<Defs><HostileDef><defName>a</defName><maxHealth>5</maxHealth></HostileDef></Defs>",
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.file_path.ends_with("defs.xml"));
        assert!(err.location.is_some());
        assert!(err.message.contains("<strength>"));
    }

    #[test]
    fn unknown_field_errors() {
        let err = compile(&format!(
            "<Defs>{}</Defs>",
            GOBLIN.replace("</HostileDef>", "<mood>Happy</mood></HostileDef>")
        ))
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn duplicate_field_errors() {
        let err = compile(&format!(
            "<Defs>{}</Defs>",
            GOBLIN.replace("</HostileDef>", "<speed>5</speed></HostileDef>")
        ))
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn invalid_values_error() {
        let negative = compile(&format!(
            "<Defs>{}</Defs>",
            GOBLIN.replace("<speed>100</speed>", "<speed>-1</speed>")
        ))
        .expect_err("negative");
        assert_eq!(negative.code, ContentErrorCode::InvalidValue);

        let kind = compile(
            "<Defs><ItemDef><defName>rock</defName><kind>material</kind></ItemDef></Defs>",
        )
        .expect_err("kind");
        assert_eq!(kind.code, ContentErrorCode::InvalidValue);

        let chance = compile(&format!(
            "<Defs>{}</Defs>",
            GOBLIN.replace("</HostileDef>", "<dropChance>1.5</dropChance></HostileDef>")
        ))
        .expect_err("chance");
        assert_eq!(chance.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile("<Defs><HostileDef><defName>a</defName></Defs>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn wrong_root_and_unknown_def_type_error() {
        let root = compile("<Things/>").expect_err("root");
        assert_eq!(root.code, ContentErrorCode::InvalidRoot);

        let kind = compile("<Defs><EntityDef/></Defs>").expect_err("kind");
        assert_eq!(kind.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn same_file_duplicate_def_errors() {
        let err = compile(&format!("<Defs>{GOBLIN}{GOBLIN}</Defs>")).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateDef);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.content_dir.join("a_defs.xml"),
            &format!("<Defs>{GOBLIN}</Defs>"),
        );
        write_file(
            &app.content_dir.join("z").join("override.xml"),
            &format!(
                "<Defs>{}</Defs>",
                GOBLIN.replace("<maxHealth>50</maxHealth>", "<maxHealth>90</maxHealth>")
            ),
        );
        write_file(&app.content_dir.join("notes.txt"), "ignored");

        let db = compile_def_database(&app).expect("compile");
        assert_eq!(db.hostiles().len(), 1);
        let goblin = db
            .hostile(db.hostile_id_by_name("goblin").expect("id"))
            .expect("goblin");
        assert_eq!(goblin.max_health, 90.0);
    }

    #[test]
    fn missing_content_dir_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let app = AppPaths {
            root: temp.path().to_path_buf(),
            content_dir: temp.path().join("nope"),
        };
        let err = compile_def_database(&app).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
        assert!(err.location.is_none());
    }
}
