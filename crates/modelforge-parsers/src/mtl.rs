//! Wavefront material library (.mtl) parser
//!
//! Line oriented: the first word of each line is the command, the rest
//! is its arguments. `#` starts a comment. Unknown commands are logged
//! and ignored so vendor extensions do not break a load.
//!
//! The specular constant defaults to a -1 sentinel because its real
//! default depends on what else the material declares: 1.0 when a
//! `map_Ks` is present, 0.5 otherwise. The sentinel is resolved when
//! the next material starts, at end of input, and when `map_Ks` is
//! read.

use modelforge_core::error::{Error, Result};
use modelforge_core::math::{Vec2, Vec3};
use std::collections::BTreeMap;
use tracing::debug;

/// A constant/map pair for one material channel
#[derive(Debug, Clone, PartialEq)]
pub struct MtlField {
    /// Constant factor
    pub constant: Vec3,
    /// Texture map path, if any
    pub map: Option<String>,
    /// Map bias (x) and gain (y) from `-mm` / `-bm` options
    pub mm: Vec2,
}

impl MtlField {
    fn with_constant(constant: Vec3) -> Self {
        Self {
            constant,
            map: None,
            mm: Vec2::new(0.0, 1.0),
        }
    }
}

/// One parsed material
#[derive(Debug, Clone, PartialEq)]
pub struct MtlMaterial {
    /// Material name from `newmtl`
    pub name: String,
    /// Ambient channel
    pub ka: MtlField,
    /// Diffuse channel
    pub kd: MtlField,
    /// Specular channel
    pub ks: MtlField,
    /// Emissive channel
    pub ke: MtlField,
    /// Bump map channel (bias/scale in `mm`)
    pub bump: MtlField,
    /// Transmission filter
    pub tf: Vec3,
    /// Dissolve (alpha)
    pub d: f32,
    /// Specular exponent
    pub ns: f32,
    /// Index of refraction
    pub ni: f32,
    /// Illumination model
    pub illum: i32,
    /// Alpha map path
    pub map_d: Option<String>,
    /// Nonstandard precomputed light map path
    pub light_map: Option<String>,
}

impl MtlMaterial {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ka: MtlField::with_constant(Vec3::ONE),
            kd: MtlField::with_constant(Vec3::splat(0.8)),
            // Sentinel, resolved once the material is complete
            ks: MtlField::with_constant(Vec3::splat(-1.0)),
            ke: MtlField::with_constant(Vec3::ZERO),
            bump: MtlField::with_constant(Vec3::ZERO),
            tf: Vec3::ONE,
            d: 1.0,
            ns: 10.0,
            ni: 1.0,
            illum: 2,
            map_d: None,
            light_map: None,
        }
    }

    fn resolve_specular_default(&mut self) {
        if self.ks.constant.x < 0.0 {
            self.ks.constant = Vec3::splat(0.5);
        }
    }
}

impl Default for MtlMaterial {
    fn default() -> Self {
        let mut m = Self::new("default");
        m.resolve_specular_default();
        m
    }
}

/// A parsed material library. Always contains a `default` material.
pub type MtlLibrary = BTreeMap<String, MtlMaterial>;

fn parse_number(word: Option<&str>, line: &str) -> Result<f32> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| Error::invalid_data(format!("expected a number in: {line}")))
}

fn parse_color(rest: &str, line: &str) -> Result<Vec3> {
    let mut words = rest.split_whitespace();
    Ok(Vec3::new(
        parse_number(words.next(), line)?,
        parse_number(words.next(), line)?,
        parse_number(words.next(), line)?,
    ))
}

fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix(['/', '\\']).unwrap_or(path)
}

/// Read a map argument list: optional `-mm bias gain` or
/// `-bm multiplier`, then the rest of the line as the path.
fn read_map(rest: &str, line: &str, field: &mut MtlField) -> Result<()> {
    let mut rest = rest.trim();
    if let Some(tail) = rest.strip_prefix("-mm") {
        let mut words = tail.split_whitespace();
        field.mm.x = parse_number(words.next(), line)?;
        field.mm.y = parse_number(words.next(), line)?;
        rest = skip_words(tail, 2);
    } else if let Some(tail) = rest.strip_prefix("-bm") {
        let mut words = tail.split_whitespace();
        field.mm.y = parse_number(words.next(), line)?;
        rest = skip_words(tail, 1);
    }
    let path = strip_leading_slash(rest.trim());
    if path.is_empty() {
        return Err(Error::invalid_data(format!("map without a path: {line}")));
    }
    field.map = Some(path.to_string());
    Ok(())
}

/// The remainder of `s` after `n` whitespace-separated words
fn skip_words(s: &str, n: usize) -> &str {
    let mut rest = s.trim_start();
    for _ in 0..n {
        match rest.find(char::is_whitespace) {
            Some(at) => rest = rest[at..].trim_start(),
            None => return "",
        }
    }
    rest
}

/// Parse a material library from text
pub fn parse_mtl(text: &str) -> Result<MtlLibrary> {
    let mut library = MtlLibrary::new();
    library.insert("default".to_string(), MtlMaterial::default());

    let mut current: Option<MtlMaterial> = None;

    for raw in text.lines() {
        let line = match raw.find('#') {
            Some(at) => &raw[..at],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.find(char::is_whitespace) {
            Some(at) => (&line[..at], line[at..].trim()),
            None => (line, ""),
        };

        if cmd == "newmtl" {
            if let Some(mut done) = current.take() {
                done.resolve_specular_default();
                library.insert(done.name.clone(), done);
            }
            current = Some(MtlMaterial::new(rest));
            continue;
        }

        let Some(material) = current.as_mut() else {
            debug!(cmd, "material command before any newmtl, ignoring");
            continue;
        };

        match cmd {
            "d" => {
                // Optional "-halo" qualifier
                let rest = rest.strip_prefix("-halo").unwrap_or(rest);
                material.d = parse_number(rest.split_whitespace().next(), line)?;
            }
            // Nonstandard inverse alpha
            "Tr" => material.d = 1.0 - parse_number(rest.split_whitespace().next(), line)?,
            "Ns" => material.ns = parse_number(rest.split_whitespace().next(), line)?,
            "Ni" => material.ni = parse_number(rest.split_whitespace().next(), line)?,
            "Ka" => material.ka.constant = parse_color(rest, line)?,
            "Kd" | "kd" => material.kd.constant = parse_color(rest, line)?,
            "Ks" => material.ks.constant = parse_color(rest, line)?,
            "Ke" => material.ke.constant = parse_color(rest, line)?,
            "Tf" => material.tf = parse_color(rest, line)?,
            "illum" => {
                material.illum = rest
                    .split_whitespace()
                    .next()
                    .and_then(|w| w.parse().ok())
                    .ok_or_else(|| Error::invalid_data(format!("bad illum: {line}")))?;
            }
            "map_Ka" => read_map(rest, line, &mut material.ka)?,
            "map_Kd" | "map_kd" => read_map(rest, line, &mut material.kd)?,
            "map_Ke" => read_map(rest, line, &mut material.ke)?,
            "map_Ks" => {
                read_map(rest, line, &mut material.ks)?;
                // A specular map without a constant means full strength
                if material.ks.constant.x < 0.0 {
                    material.ks.constant = Vec3::ONE;
                }
            }
            "map_bump" | "bump" | "map_Bump" => read_map(rest, line, &mut material.bump)?,
            "map_d" | "map_D" => {
                material.map_d = Some(strip_leading_slash(rest).to_string());
            }
            "lightMap" => {
                material.light_map = Some(strip_leading_slash(rest).to_string());
            }
            other => {
                debug!(cmd = other, "ignoring unrecognized material command");
            }
        }
    }

    if let Some(mut done) = current.take() {
        done.resolve_specular_default();
        library.insert(done.name.clone(), done);
    }

    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_always_present() {
        let library = parse_mtl("").unwrap();
        let default = &library["default"];
        assert_eq!(default.kd.constant, Vec3::splat(0.8));
        assert_eq!(default.ks.constant, Vec3::splat(0.5));
        assert_eq!(default.d, 1.0);
        assert_eq!(default.illum, 2);
    }

    #[test]
    fn test_basic_material() {
        let library = parse_mtl(
            "# test library\n\
             newmtl shiny metal\n\
             Kd 0.2 0.3 0.4\n\
             Ks 1.0 1.0 1.0\n\
             Ns 96.0\n\
             illum 3\n",
        )
        .unwrap();
        let m = &library["shiny metal"];
        assert_eq!(m.name, "shiny metal");
        assert_eq!(m.kd.constant, Vec3::new(0.2, 0.3, 0.4));
        assert_eq!(m.ks.constant, Vec3::ONE);
        assert_eq!(m.ns, 96.0);
        assert_eq!(m.illum, 3);
    }

    #[test]
    fn test_specular_sentinel_resolution() {
        let library = parse_mtl(
            "newmtl plain\n\
             Kd 1 1 1\n\
             newmtl mapped\n\
             map_Ks /textures/spec.png\n",
        )
        .unwrap();
        // No Ks and no map: defaults to 0.5
        assert_eq!(library["plain"].ks.constant, Vec3::splat(0.5));
        // map_Ks without constant: defaults to 1.0
        let mapped = &library["mapped"];
        assert_eq!(mapped.ks.constant, Vec3::ONE);
        assert_eq!(mapped.ks.map.as_deref(), Some("textures/spec.png"));
    }

    #[test]
    fn test_specular_sentinel_resolved_at_eof() {
        // The last material has no Ks and nothing follows it
        let library = parse_mtl("newmtl last\nKd 1 0 0\n").unwrap();
        assert_eq!(library["last"].ks.constant, Vec3::splat(0.5));
    }

    #[test]
    fn test_dissolve_variants() {
        let library = parse_mtl(
            "newmtl a\nd 0.25\n\
             newmtl b\nd -halo 0.75\n\
             newmtl c\nTr 0.4\n",
        )
        .unwrap();
        assert_eq!(library["a"].d, 0.25);
        assert_eq!(library["b"].d, 0.75);
        assert!((library["c"].d - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_map_options() {
        let library = parse_mtl(
            "newmtl m\n\
             map_bump -bm 0.02 bump.png\n\
             map_Kd -mm 0.1 0.9 diffuse.png\n",
        )
        .unwrap();
        let m = &library["m"];
        assert_eq!(m.bump.map.as_deref(), Some("bump.png"));
        assert!((m.bump.mm.y - 0.02).abs() < 1e-6);
        assert_eq!(m.kd.map.as_deref(), Some("diffuse.png"));
        assert!((m.kd.mm.x - 0.1).abs() < 1e-6);
        assert!((m.kd.mm.y - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_commands_ignored() {
        let library = parse_mtl(
            "newmtl m\n\
             Kd 0.5 0.5 0.5\n\
             fancy_vendor_thing 1 2 3\n\
             Ni 1.5\n",
        )
        .unwrap();
        assert_eq!(library["m"].ni, 1.5);
    }

    #[test]
    fn test_command_before_newmtl_ignored() {
        let library = parse_mtl("Kd 1 0 0\nnewmtl m\nKd 0 1 0\n").unwrap();
        assert_eq!(library["m"].kd.constant, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_malformed_number_rejected() {
        assert!(parse_mtl("newmtl m\nNs not-a-number\n").is_err());
    }
}
