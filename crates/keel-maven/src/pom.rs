//! POM files: reading dependency metadata from a local repository and
//! writing the POM that accompanies a published artifact.

use std::collections::BTreeMap;
use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use keel_util::errors::KeelError;

const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
const MAX_INTERPOLATION_DEPTH: usize = 10;

/// The parts of a POM that matter for dependency reconciliation and
/// publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    /// Entries of `<dependencyManagement>`.
    pub managed: Vec<PomDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    /// `(group, artifact)` pairs; `*` is a wildcard.
    pub exclusions: Vec<(String, String)>,
}

impl PomDependency {
    /// Whether a consumer of the declaring artifact sees this dependency.
    ///
    /// Only `compile` and `runtime` dependencies are transitive; optional
    /// ones never are.
    pub fn is_transitive(&self) -> bool {
        !self.optional && matches!(self.scope.as_deref(), None | Some("compile") | Some("runtime"))
    }
}

impl Pom {
    pub fn parse(xml: &str) -> miette::Result<Self> {
        PomReader::default().read(xml)
    }

    pub fn group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group.as_str()))
    }

    pub fn version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Fill in inherited properties and managed versions from `parent`.
    pub fn inherit(&mut self, parent: &Pom) {
        for (key, value) in &parent.properties {
            self.properties.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for entry in &parent.managed {
            if self.managed_version(&entry.group, &entry.artifact).is_none() {
                self.managed.push(entry.clone());
            }
        }
    }

    pub fn managed_version(&self, group: &str, artifact: &str) -> Option<&str> {
        self.managed
            .iter()
            .find(|d| d.group == group && d.artifact == artifact)
            .and_then(|d| d.version.as_deref())
    }

    /// Dependencies with `${...}` expanded and missing versions taken from
    /// `<dependencyManagement>`.
    pub fn effective_dependencies(&self) -> Vec<PomDependency> {
        let managed: Vec<PomDependency> = self.managed.iter().map(|d| self.expand_dep(d)).collect();
        self.dependencies
            .iter()
            .map(|d| {
                let mut dep = self.expand_dep(d);
                if dep.version.is_none() {
                    dep.version = managed
                        .iter()
                        .find(|m| m.group == dep.group && m.artifact == dep.artifact)
                        .and_then(|m| m.version.clone());
                }
                dep
            })
            .collect()
    }

    fn expand_dep(&self, dep: &PomDependency) -> PomDependency {
        PomDependency {
            group: self.expand(&dep.group),
            artifact: self.expand(&dep.artifact),
            version: dep.version.as_deref().map(|v| self.expand(v)),
            scope: dep.scope.clone(),
            optional: dep.optional,
            exclusions: dep.exclusions.clone(),
        }
    }

    /// Expand `${name}` using POM properties and `project.*` values.
    /// Unknown names are left untouched.
    pub fn expand(&self, input: &str) -> String {
        let mut current = input.to_string();
        for _ in 0..MAX_INTERPOLATION_DEPTH {
            let next = self.expand_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn expand_once(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let Some(len) = rest[start..].find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &rest[start + 2..start + len];
            match self.property(name) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..=start + len]),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    fn property(&self, name: &str) -> Option<String> {
        let key = name.strip_prefix("project.").or_else(|| name.strip_prefix("pom."));
        match key {
            Some("groupId") => self.group().map(str::to_string),
            Some("artifactId") => self.artifact.clone(),
            Some("version") => self.version().map(str::to_string),
            Some("parent.version") => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(name).cloned(),
        }
    }

    /// Render this POM as the XML document uploaded next to an artifact.
    pub fn to_xml(&self) -> miette::Result<String> {
        let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        emit(
            &mut w,
            Event::Start(BytesStart::new("project").with_attributes([("xmlns", POM_NAMESPACE)])),
        )?;
        leaf(&mut w, "modelVersion", "4.0.0")?;
        if let Some(parent) = &self.parent {
            open(&mut w, "parent")?;
            leaf(&mut w, "groupId", &parent.group)?;
            leaf(&mut w, "artifactId", &parent.artifact)?;
            leaf(&mut w, "version", &parent.version)?;
            close(&mut w, "parent")?;
        }
        optional_leaf(&mut w, "groupId", self.group.as_deref())?;
        optional_leaf(&mut w, "artifactId", self.artifact.as_deref())?;
        optional_leaf(&mut w, "version", self.version.as_deref())?;
        optional_leaf(&mut w, "packaging", self.packaging.as_deref())?;
        optional_leaf(&mut w, "description", self.description.as_deref())?;

        if !self.properties.is_empty() {
            open(&mut w, "properties")?;
            for (key, value) in &self.properties {
                leaf(&mut w, key, value)?;
            }
            close(&mut w, "properties")?;
        }
        if !self.managed.is_empty() {
            open(&mut w, "dependencyManagement")?;
            write_dependencies(&mut w, &self.managed)?;
            close(&mut w, "dependencyManagement")?;
        }
        if !self.dependencies.is_empty() {
            write_dependencies(&mut w, &self.dependencies)?;
        }
        close(&mut w, "project")?;

        String::from_utf8(w.into_inner().into_inner()).map_err(|e| {
            KeelError::Generic {
                message: format!("generated POM is not UTF-8: {e}"),
            }
            .into()
        })
    }
}

fn write_dependencies(w: &mut Writer<Cursor<Vec<u8>>>, deps: &[PomDependency]) -> miette::Result<()> {
    open(w, "dependencies")?;
    for dep in deps {
        open(w, "dependency")?;
        leaf(w, "groupId", &dep.group)?;
        leaf(w, "artifactId", &dep.artifact)?;
        optional_leaf(w, "version", dep.version.as_deref())?;
        optional_leaf(w, "scope", dep.scope.as_deref())?;
        if dep.optional {
            leaf(w, "optional", "true")?;
        }
        if !dep.exclusions.is_empty() {
            open(w, "exclusions")?;
            for (group, artifact) in &dep.exclusions {
                open(w, "exclusion")?;
                leaf(w, "groupId", group)?;
                leaf(w, "artifactId", artifact)?;
                close(w, "exclusion")?;
            }
            close(w, "exclusions")?;
        }
        close(w, "dependency")?;
    }
    close(w, "dependencies")
}

fn emit(w: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> miette::Result<()> {
    w.write_event(event).map_err(|e| {
        KeelError::Generic {
            message: format!("failed to write POM: {e}"),
        }
        .into()
    })
}

fn open(w: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> miette::Result<()> {
    emit(w, Event::Start(BytesStart::new(name)))
}

fn close(w: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> miette::Result<()> {
    emit(w, Event::End(BytesEnd::new(name)))
}

fn leaf(w: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) -> miette::Result<()> {
    open(w, name)?;
    emit(w, Event::Text(BytesText::new(value)))?;
    close(w, name)
}

fn optional_leaf(w: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: Option<&str>) -> miette::Result<()> {
    match value {
        Some(v) => leaf(w, name, v),
        None => Ok(()),
    }
}

/// Streaming reader that tracks the element path and assigns text to the
/// field the path names.
#[derive(Default)]
struct PomReader {
    path: Vec<String>,
    text: String,
    pom: Pom,
    dep: Option<PomDependency>,
    exclusion: Option<(String, String)>,
}

impl PomReader {
    fn read(mut self, xml: &str) -> miette::Result<Pom> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.path.push(name);
                    self.text.clear();
                    self.on_start();
                }
                Ok(Event::Text(e)) => {
                    self.text = e
                        .unescape()
                        .map_err(|err| parse_error(&err))?
                        .into_owned();
                }
                Ok(Event::End(_)) => {
                    self.on_end();
                    self.path.pop();
                    self.text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(parse_error(&e)),
                _ => {}
            }
        }
        Ok(self.pom)
    }

    fn at(&self, suffix: &[&str]) -> bool {
        self.path.len() >= suffix.len()
            && self.path[self.path.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| a == b)
    }

    fn in_dependency_list(&self) -> bool {
        let p: Vec<&str> = self.path.iter().map(String::as_str).collect();
        matches!(
            p.as_slice(),
            ["project", "dependencies", "dependency", ..]
                | ["project", "dependencyManagement", "dependencies", "dependency", ..]
        )
    }

    fn on_start(&mut self) {
        if self.at(&["dependencies", "dependency"]) && self.in_dependency_list() {
            self.dep = Some(PomDependency::default());
        } else if self.at(&["exclusions", "exclusion"]) && self.dep.is_some() {
            self.exclusion = Some((String::new(), String::new()));
        } else if self.path == ["project", "parent"] {
            self.pom.parent = Some(ParentRef::default());
        }
    }

    fn on_end(&mut self) {
        let value = std::mem::take(&mut self.text);
        let depth = self.path.len();
        let leaf = self.path.last().map(String::as_str).unwrap_or("");

        if let Some(exclusion) = self.exclusion.as_mut() {
            match leaf {
                "groupId" => exclusion.0 = value,
                "artifactId" => exclusion.1 = value,
                "exclusion" => {
                    if let (Some(dep), Some(done)) = (self.dep.as_mut(), self.exclusion.take()) {
                        dep.exclusions.push(done);
                    }
                }
                _ => {}
            }
            return;
        }

        if let Some(dep) = self.dep.as_mut() {
            match leaf {
                "groupId" => dep.group = value,
                "artifactId" => dep.artifact = value,
                "version" => dep.version = Some(value),
                "scope" => dep.scope = Some(value),
                "optional" => dep.optional = value == "true",
                "dependency" => {
                    let managed = self.path.get(1).map(String::as_str) == Some("dependencyManagement");
                    if let Some(done) = self.dep.take() {
                        if managed {
                            self.pom.managed.push(done);
                        } else {
                            self.pom.dependencies.push(done);
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        match (depth, self.path.get(1).map(String::as_str)) {
            (3, Some("parent")) => {
                if let Some(parent) = self.pom.parent.as_mut() {
                    match leaf {
                        "groupId" => parent.group = value,
                        "artifactId" => parent.artifact = value,
                        "version" => parent.version = value,
                        _ => {}
                    }
                }
            }
            (3, Some("properties")) => {
                self.pom.properties.insert(leaf.to_string(), value);
            }
            (2, _) => match leaf {
                "groupId" => self.pom.group = Some(value),
                "artifactId" => self.pom.artifact = Some(value),
                "version" => self.pom.version = Some(value),
                "packaging" => self.pom.packaging = Some(value),
                "description" => self.pom.description = Some(value),
                _ => {}
            },
            _ => {}
        }
    }
}

fn parse_error(e: &dyn std::fmt::Display) -> miette::Report {
    KeelError::Generic {
        message: format!("Failed to parse POM XML: {e}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRPC_CORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>io.grpc</groupId>
  <artifactId>grpc-core</artifactId>
  <version>1.47.0</version>
  <properties>
    <guava.version>31.0.1-android</guava.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.google.code.gson</groupId>
        <artifactId>gson</artifactId>
        <version>2.9.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>${project.groupId}</groupId>
      <artifactId>grpc-api</artifactId>
      <version>${project.version}</version>
    </dependency>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
      <exclusions>
        <exclusion>
          <groupId>com.google.code.findbugs</groupId>
          <artifactId>jsr305</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
    <dependency>
      <groupId>com.google.code.gson</groupId>
      <artifactId>gson</artifactId>
      <scope>runtime</scope>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn reads_coordinates_and_dependencies() {
        let pom = Pom::parse(GRPC_CORE).unwrap();
        assert_eq!(pom.group.as_deref(), Some("io.grpc"));
        assert_eq!(pom.version(), Some("1.47.0"));
        assert_eq!(pom.dependencies.len(), 4);
        assert_eq!(pom.managed.len(), 1);
        assert_eq!(
            pom.dependencies[1].exclusions,
            vec![("com.google.code.findbugs".to_string(), "jsr305".to_string())]
        );
    }

    #[test]
    fn effective_dependencies_expand_and_fill_managed_versions() {
        let pom = Pom::parse(GRPC_CORE).unwrap();
        let deps = pom.effective_dependencies();
        assert_eq!(deps[0].group, "io.grpc");
        assert_eq!(deps[0].version.as_deref(), Some("1.47.0"));
        assert_eq!(deps[1].version.as_deref(), Some("31.0.1-android"));
        assert_eq!(deps[2].version.as_deref(), Some("2.9.0"));
        assert!(deps[2].is_transitive());
        assert!(!deps[3].is_transitive());
    }

    #[test]
    fn parent_supplies_group_and_properties() {
        let child = r#"<project>
  <parent>
    <groupId>io.grpc</groupId>
    <artifactId>grpc-parent</artifactId>
    <version>1.47.0</version>
  </parent>
  <artifactId>grpc-stub</artifactId>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>${guava.version}</version>
    </dependency>
  </dependencies>
</project>"#;
        let parent = Pom::parse(
            "<project><properties><guava.version>31.1-jre</guava.version></properties></project>",
        )
        .unwrap();
        let mut pom = Pom::parse(child).unwrap();
        assert_eq!(pom.group(), Some("io.grpc"));
        pom.inherit(&parent);
        assert_eq!(
            pom.effective_dependencies()[0].version.as_deref(),
            Some("31.1-jre")
        );
    }

    #[test]
    fn unknown_property_is_left_alone() {
        let pom = Pom::default();
        assert_eq!(pom.expand("${nope}-1"), "${nope}-1");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(Pom::parse("<project><groupId>x</artifactId></project>").is_err());
    }

    #[test]
    fn written_pom_reads_back() {
        let pom = Pom {
            group: Some("io.spine.tools".into()),
            artifact: Some("spine-model-check".into()),
            version: Some("2.0.0".into()),
            packaging: Some("jar".into()),
            description: Some("Model checks & validation".into()),
            dependencies: vec![PomDependency {
                group: "io.grpc".into(),
                artifact: "grpc-core".into(),
                version: Some("1.47.0".into()),
                scope: Some("runtime".into()),
                optional: false,
                exclusions: vec![("com.google.protobuf".into(), "protobuf-lite".into())],
            }],
            ..Pom::default()
        };
        let xml = pom.to_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<modelVersion>4.0.0</modelVersion>"));
        assert!(xml.contains("Model checks &amp; validation"));
        assert_eq!(Pom::parse(&xml).unwrap(), pom);
    }
}
