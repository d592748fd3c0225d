//! WKT coordinate system text, as found in shapefile `.prj` files
//!
//! Parsed into a node tree, then translated to a PROJ.4 string for the
//! projection methods BC and federal datasets are published in.

use crate::{GeoError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Text(String),
    Number(f64),
    Node(PrjNode),
}

/// `KEYWORD[item, item, ...]`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrjNode {
    keyword: String,
    items: Vec<Item>,
}

impl PrjNode {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser {
            chars: text.trim().chars().collect(),
            pos: 0,
        };
        let node = parser.node()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing text"));
        }
        Ok(node)
    }

    fn name(&self) -> Option<&str> {
        self.items.iter().find_map(|i| match i {
            Item::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    fn numbers(&self) -> Vec<f64> {
        self.items
            .iter()
            .filter_map(|i| match i {
                Item::Number(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    fn children<'a, 'k>(&'a self, keyword: &'k str) -> impl Iterator<Item = &'a PrjNode> + use<'a, 'k> {
        self.items.iter().filter_map(move |i| match i {
            Item::Node(n) if n.keyword.eq_ignore_ascii_case(keyword) => Some(n),
            _ => None,
        })
    }

    fn child(&self, keyword: &str) -> Option<&PrjNode> {
        self.children(keyword).next()
    }

    /// First node named `keyword` at any depth
    fn find(&self, keyword: &str) -> Option<&PrjNode> {
        self.child(keyword).or_else(|| {
            self.items.iter().find_map(|i| match i {
                Item::Node(n) => n.find(keyword),
                _ => None,
            })
        })
    }

    /// `AUTHORITY["EPSG", "code"]` directly on this node
    pub(crate) fn epsg_authority(&self) -> Option<u32> {
        let authority = self.child("AUTHORITY")?;
        let mut texts = authority.items.iter().filter_map(|i| match i {
            Item::Text(s) => Some(s.clone()),
            Item::Number(n) => Some(format!("{}", n)),
            Item::Node(_) => None,
        });
        let body = texts.next()?;
        if !body.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        texts.next()?.trim().parse().ok()
    }

    fn parameter(&self, names: &[&str]) -> Option<f64> {
        self.children("PARAMETER").find_map(|p| {
            let name = normalise(p.name()?);
            names
                .iter()
                .any(|n| normalise(n) == name)
                .then(|| p.numbers().first().copied())
                .flatten()
        })
    }

    pub(crate) fn to_proj_string(&self) -> Result<String> {
        let keyword = self.keyword.to_ascii_uppercase();
        match keyword.as_str() {
            "GEOGCS" => Ok(format!("+proj=longlat {} +no_defs", geodetic(self))),
            "PROJCS" => self.projected(),
            other => Err(GeoError::UnrecognisedCrs(format!("{} coordinate system", other))),
        }
    }

    fn projected(&self) -> Result<String> {
        let method = self
            .child("PROJECTION")
            .and_then(PrjNode::name)
            .ok_or_else(|| GeoError::UnrecognisedCrs("PROJCS without PROJECTION".to_string()))?;

        let lat_0 = self.parameter(&["latitude_of_origin", "latitude_of_center"]).unwrap_or(0.0);
        let lon_0 = self
            .parameter(&["central_meridian", "longitude_of_center", "longitude_of_origin"])
            .unwrap_or(0.0);
        let lat_1 = self.parameter(&["standard_parallel_1"]);
        let lat_2 = self.parameter(&["standard_parallel_2"]);
        let k = self.parameter(&["scale_factor"]).unwrap_or(1.0);

        let mut sphere = false;
        let mut def = match normalise(method).as_str() {
            "albers" | "albersconicequalarea" => {
                let (lat_1, lat_2) = match (lat_1, lat_2) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(GeoError::UnrecognisedCrs("Albers without standard parallels".to_string())),
                };
                format!("+proj=aea +lat_0={} +lon_0={} +lat_1={} +lat_2={}", lat_0, lon_0, lat_1, lat_2)
            }
            "transversemercator" => format!("+proj=tmerc +lat_0={} +lon_0={} +k={}", lat_0, lon_0, k),
            "lambertconformalconic" | "lambertconformalconic2sp" | "lambertconformalconic1sp" => {
                let lat_1 = lat_1.unwrap_or(lat_0);
                let lat_2 = lat_2.unwrap_or(lat_1);
                format!(
                    "+proj=lcc +lat_0={} +lon_0={} +lat_1={} +lat_2={} +k_0={}",
                    lat_0, lon_0, lat_1, lat_2, k
                )
            }
            "mercator" | "mercator1sp" | "mercator2sp" => match lat_1 {
                Some(lat_ts) => format!("+proj=merc +lon_0={} +lat_ts={}", lon_0, lat_ts),
                None => format!("+proj=merc +lon_0={} +k={}", lon_0, k),
            },
            "mercatorauxiliarysphere" => {
                sphere = true;
                format!("+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0={} +k=1", lon_0)
            }
            _ => return Err(GeoError::UnrecognisedCrs(format!("projection method {}", method))),
        };

        let x_0 = self.parameter(&["false_easting"]).unwrap_or(0.0);
        let y_0 = self.parameter(&["false_northing"]).unwrap_or(0.0);
        def.push_str(&format!(" +x_0={} +y_0={}", x_0, y_0));

        if !sphere {
            let geogcs = self
                .child("GEOGCS")
                .ok_or_else(|| GeoError::UnrecognisedCrs("PROJCS without GEOGCS".to_string()))?;
            def.push(' ');
            def.push_str(&geodetic(geogcs));
        }

        // linear unit directly on PROJCS, in metres per unit
        match self.child("UNIT").and_then(|u| u.numbers().first().copied()) {
            Some(factor) if (factor - 1.0).abs() > 1e-12 => {
                def.push_str(&format!(" +to_meter={}", factor));
            }
            _ => def.push_str(" +units=m"),
        }
        def.push_str(" +no_defs");
        Ok(def)
    }
}

/// Datum or ellipsoid terms for a GEOGCS node
fn geodetic(geogcs: &PrjNode) -> String {
    let datum = geogcs.find("DATUM").and_then(PrjNode::name).map(normalise);
    match datum.as_deref() {
        Some(d) if d.contains("northamerican1983") && !d.contains("csrs") => return "+datum=NAD83".to_string(),
        Some(d) if d == "nad83" => return "+datum=NAD83".to_string(),
        Some(d) if d.contains("wgs1984") || d == "wgs84" => return "+datum=WGS84".to_string(),
        _ => {}
    }

    let spheroid = geogcs.find("SPHEROID").or_else(|| geogcs.find("ELLIPSOID"));
    let Some(spheroid) = spheroid else {
        return "+ellps=WGS84".to_string();
    };
    let name = spheroid.name().map(normalise).unwrap_or_default();
    let towgs84 = if datum.as_deref().is_some_and(|d| d.contains("csrs")) {
        " +towgs84=0,0,0"
    } else {
        ""
    };
    if name.contains("grs1980") || name == "grs80" {
        return format!("+ellps=GRS80{}", towgs84);
    }
    if name.contains("wgs1984") || name == "wgs84" {
        return format!("+ellps=WGS84{}", towgs84);
    }
    if name.contains("clarke1866") {
        return "+ellps=clrk66".to_string();
    }
    match spheroid.numbers().as_slice() {
        [a, rf, ..] if *rf > 0.0 => format!("+a={} +rf={}{}", a, rf, towgs84),
        [a, ..] => format!("+a={} +b={}", a, a),
        [] => "+ellps=WGS84".to_string(),
    }
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, what: &str) -> GeoError {
        GeoError::UnrecognisedCrs(format!("{} at offset {}", what, self.pos))
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn node(&mut self) -> Result<PrjNode> {
        self.skip_ws();
        let start = self.pos;
        while self.chars.get(self.pos).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected keyword"));
        }
        let keyword: String = self.chars[start..self.pos].iter().collect();

        let close = match self.peek() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(self.error("expected '['")),
        };
        self.pos += 1;

        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(',') if !items.is_empty() => self.pos += 1,
                Some(_) if items.is_empty() => {}
                _ => return Err(self.error("unterminated node")),
            }
            items.push(self.item()?);
            if self.peek() == Some(close) {
                continue;
            }
            if self.peek() != Some(',') {
                return Err(self.error("expected ','"));
            }
        }
        Ok(PrjNode { keyword, items })
    }

    fn item(&mut self) -> Result<Item> {
        match self.peek() {
            Some('"') => {
                self.pos += 1;
                let mut text = String::new();
                loop {
                    match self.chars.get(self.pos) {
                        Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => {
                            text.push('"');
                            self.pos += 2;
                        }
                        Some('"') => {
                            self.pos += 1;
                            return Ok(Item::Text(text));
                        }
                        Some(c) => {
                            text.push(*c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let start = self.pos;
                while self
                    .chars
                    .get(self.pos)
                    .is_some_and(|c| c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'e' | 'E'))
                {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse()
                    .map(Item::Number)
                    .map_err(|_| self.error("malformed number"))
            }
            Some(_) => self.node().map(Item::Node),
            None => Err(self.error("unexpected end")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let node = PrjNode::parse(r#"GEOGCS["GCS ""quoted""", DATUM["D", SPHEROID["S", 1.5e2, -3]]]"#).unwrap();
        assert_eq!(node.keyword, "GEOGCS");
        assert_eq!(node.name(), Some("GCS \"quoted\""));
        assert_eq!(node.find("SPHEROID").unwrap().numbers(), vec![150.0, -3.0]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(PrjNode::parse("").is_err());
        assert!(PrjNode::parse(r#"GEOGCS["x""#).is_err());
        assert!(PrjNode::parse(r#"GEOGCS["x"] extra"#).is_err());
        assert!(PrjNode::parse(r#"GEOGCS["x" "y"]"#).is_err());
    }

    #[test]
    fn test_utm_proj_string() {
        let node = PrjNode::parse(
            r#"PROJCS["NAD_1983_UTM_Zone_9N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["Central_Meridian",-129.0],PARAMETER["Scale_Factor",0.9996],UNIT["Meter",1.0]]"#,
        )
        .unwrap();
        assert_eq!(
            node.to_proj_string().unwrap(),
            "+proj=tmerc +lat_0=0 +lon_0=-129 +k=0.9996 +x_0=500000 +y_0=0 +datum=NAD83 +units=m +no_defs"
        );
    }

    #[test]
    fn test_feet_and_spheroid_fallback() {
        let node = PrjNode::parse(
            r#"PROJCS["Local",GEOGCS["GCS_Other",DATUM["D_Other",SPHEROID["Other",6378206.4,294.9786982]]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["Standard_Parallel_1",49.0],PARAMETER["Standard_Parallel_2",77.0],PARAMETER["Latitude_Of_Origin",49.0],PARAMETER["Central_Meridian",-95.0],UNIT["Foot_US",0.3048006096012192]]"#,
        )
        .unwrap();
        let def = node.to_proj_string().unwrap();
        assert!(def.starts_with("+proj=lcc +lat_0=49 +lon_0=-95 +lat_1=49 +lat_2=77"));
        assert!(def.contains("+a=6378206.4 +rf=294.9786982"));
        assert!(def.contains("+to_meter=0.3048006096012192"));
    }

    #[test]
    fn test_epsg_authority() {
        let node = PrjNode::parse(r#"PROJCS["x",AUTHORITY["EPSG","26910"]]"#).unwrap();
        assert_eq!(node.epsg_authority(), Some(26910));
        let node = PrjNode::parse(r#"PROJCS["x",AUTHORITY["ESRI","102001"]]"#).unwrap();
        assert_eq!(node.epsg_authority(), None);
    }
}
