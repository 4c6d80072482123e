//! Visualization utilities for p-center solutions.
//!
//! Generates SVG pictures of geometric instances (nodes, open centers,
//! node-to-center assignments and the bottleneck coverage circle) and
//! exports for plotting.

use crate::instance::Node;
use crate::problem::Problem;
use crate::solution::Solution;
use std::fs::File;
use std::io::Write;
use std::path::Path;
#[cfg(not(feature = "resvg"))]
use std::process::Command;
#[cfg(feature = "resvg")]
use resvg::usvg;
#[cfg(feature = "resvg")]
use resvg::render;
#[cfg(feature = "resvg")]
use resvg::FitTo;
#[cfg(feature = "resvg")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "resvg")]
use resvg::usvg::TreeParsing;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Node radius
    pub node_radius: f64,
    /// Print node ids next to nodes
    pub labels: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 3.0,
            labels: false,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate SVG visualization of a solution on a geometric instance
    pub fn generate_svg(&self, nodes: &[Node], problem: &Problem, solution: &Solution) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = self.get_bounds(nodes);

        let scale_x = (self.width - 2.0 * self.margin) / (max_x - min_x).max(1e-9);
        let scale_y = (self.height - 2.0 * self.margin) / (max_y - min_y).max(1e-9);
        let scale = scale_x.min(scale_y);

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .node {{ fill: #3498db; stroke: #2c3e50; stroke-width: 1; }}
    .center {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 2; }}
    .bottleneck {{ fill: #f39c12; stroke: #d68910; stroke-width: 2; }}
    .edge {{ stroke: #95a5a6; stroke-width: 1; fill: none; }}
    .coverage {{ stroke: #e74c3c; stroke-width: 1.5; stroke-dasharray: 6,4; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
"##,
            self.width, self.height, self.width, self.height
        ));

        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | P: {} | Radius: {:.2} | Feasible: {}</text>
"##,
            self.margin,
            solution.instance,
            solution.centers.len(),
            solution.objective,
            solution.feasible
        ));

        let transform = |x: f64, y: f64| -> (f64, f64) {
            let tx = self.margin + (x - min_x) * scale;
            let ty = self.height - self.margin - (y - min_y) * scale;
            (tx, ty)
        };

        let assignment = solution.assignment(problem);
        for (v, &(c, _)) in assignment.iter().enumerate() {
            if c == v || c >= nodes.len() {
                continue;
            }
            let (x1, y1) = transform(nodes[v].x, nodes[v].y);
            let (x2, y2) = transform(nodes[c].x, nodes[c].y);
            svg.push_str(&format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" class="edge"/>
"#,
                x1, y1, x2, y2
            ));
        }

        // node served at the coverage radius, lowest id first
        let bottleneck = assignment
            .iter()
            .enumerate()
            .filter(|&(_, &(_, d))| d == solution.cover_radius)
            .map(|(v, &(c, _))| (v, c))
            .next();
        if let Some((_, c)) = bottleneck {
            if c < nodes.len() {
                let (cx, cy) = transform(nodes[c].x, nodes[c].y);
                svg.push_str(&format!(
                    r##"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" class="coverage"/>
"##,
                    cx,
                    cy,
                    solution.objective * scale
                ));
            }
        }

        for (v, node) in nodes.iter().enumerate() {
            let (x, y) = transform(node.x, node.y);
            let is_center = solution.centers.binary_search(&v).is_ok();
            let (class, r) = if is_center {
                ("center", self.node_radius * 2.0)
            } else if bottleneck.map_or(false, |(b, _)| b == v) {
                ("bottleneck", self.node_radius * 1.5)
            } else {
                ("node", self.node_radius)
            };

            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="{}"/>
"##,
                x, y, r, class
            ));

            if self.labels {
                svg.push_str(&format!(
                    r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                    x,
                    y - r - 3.0,
                    node.id
                ));
            }
        }

        let legend_y = self.height - 30.0;
        svg.push_str(&format!(r##"
<rect x="{}" y="{}" width="15" height="15" class="center"/>
<text x="{}" y="{}" class="label">Center</text>
<rect x="{}" y="{}" width="15" height="15" class="node"/>
<text x="{}" y="{}" class="label">Node</text>
<rect x="{}" y="{}" width="15" height="15" class="bottleneck"/>
<text x="{}" y="{}" class="label">Bottleneck</text>
"##,
            self.margin, legend_y, self.margin + 20.0, legend_y + 12.0,
            self.margin + 80.0, legend_y, self.margin + 100.0, legend_y + 12.0,
            self.margin + 160.0, legend_y, self.margin + 180.0, legend_y + 12.0
        ));

        svg.push_str("</svg>");

        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG.
    ///
    /// Uses resvg when the `resvg` feature is enabled, otherwise tries
    /// `rsvg-convert`, then `magick convert`, then `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        #[cfg(feature = "resvg")]
        let result = self.render_png(svg, path.as_ref());
        #[cfg(not(feature = "resvg"))]
        let result = convert_png(svg, path.as_ref());
        result
    }

    #[cfg(feature = "resvg")]
    fn render_png(&self, svg: &str, path: &Path) -> std::io::Result<()> {
        let opt = usvg::Options::default();
        let rtree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("usvg parse error: {}", e)))?;
        let mut pixmap = Pixmap::new((self.width as u32).max(1), (self.height as u32).max(1))
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to create pixmap"))?;
        render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "resvg render failed"))?;
        pixmap
            .save_png(path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("save_png failed: {}", e)))
    }

    /// Get coordinate bounds
    fn get_bounds(&self, nodes: &[Node]) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for node in nodes {
            min_x = min_x.min(node.x);
            max_x = max_x.max(node.x);
            min_y = min_y.min(node.y);
            max_y = max_y.max(node.y);
        }

        if nodes.is_empty() {
            return (0.0, 1.0, 0.0, 1.0);
        }
        (min_x, max_x, min_y, max_y)
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, nodes: &[Node], problem: &Problem, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# p-center Solution Data\n");
        data.push_str(&format!("# Instance: {}\n", solution.instance));
        data.push_str(&format!("# Radius: {}\n", solution.objective));
        data.push_str(&format!("# Feasible: {}\n\n", solution.feasible));

        data.push_str("# Nodes: id, x, y, center, distance\n");
        for (node, (c, d)) in nodes.iter().zip(solution.assignment(problem)) {
            data.push_str(&format!(
                "{},{},{},{},{}\n",
                node.id,
                node.x,
                node.y,
                c,
                problem.scaled(d)
            ));
        }

        data.push_str("\n# Centers\n");
        let centers: Vec<String> = solution.centers.iter().map(|c| c.to_string()).collect();
        data.push_str(&centers.join(","));
        data.push('\n');

        data
    }
}

/// Convert through the first external SVG converter that succeeds
#[cfg(not(feature = "resvg"))]
fn convert_png(svg: &str, path: &Path) -> std::io::Result<()> {
    let tmp_svg = path.with_extension("svg.tmp");
    {
        let mut f = File::create(&tmp_svg)?;
        f.write_all(svg.as_bytes())?;
    }
    let tmp = tmp_svg.to_string_lossy().to_string();
    let out = path.to_string_lossy().to_string();

    let converters: [(&str, Vec<&str>); 3] = [
        ("rsvg-convert", vec!["-o", out.as_str(), tmp.as_str()]),
        ("magick", vec!["convert", tmp.as_str(), out.as_str()]),
        ("inkscape", vec![tmp.as_str(), "--export-type=png", "--export-filename", out.as_str()]),
    ];
    for (program, args) in &converters {
        if let Ok(status) = Command::new(program).args(args).status() {
            if status.success() {
                let _ = std::fs::remove_file(&tmp_svg);
                return Ok(());
            }
        }
    }

    let _ = std::fs::remove_file(&tmp_svg);
    Err(std::io::Error::new(
        std::io::ErrorKind::Other,
        "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DistanceMatrix, GEOMETRIC_OBJECTIVE_SCALE};

    fn create_test_problem() -> (Vec<Node>, Problem) {
        let nodes = vec![
            Node::new(0, 0.0, 0.0),
            Node::new(1, 1.0, 0.0),
            Node::new(2, 0.0, 1.0),
            Node::new(3, 5.0, 5.0),
        ];
        let matrix = DistanceMatrix::from_coordinates(&nodes, GEOMETRIC_OBJECTIVE_SCALE);
        let mut problem = Problem::from_matrix("test", matrix, 2).unwrap();
        problem.objective_scale = GEOMETRIC_OBJECTIVE_SCALE;
        (nodes, problem)
    }

    #[test]
    fn test_visualizer() {
        let (nodes, problem) = create_test_problem();
        let solution = Solution::from_centers(&problem, vec![0, 3], "test");

        let viz = Visualizer::new();
        let svg = viz.generate_svg(&nodes, &problem, &solution);

        assert!(svg.contains("svg"));
        assert!(svg.contains("test"));
        assert_eq!(svg.matches(r#"class="center""#).count(), 3);
        assert_eq!(svg.matches(r#"class="edge""#).count(), 2);
        assert!(svg.contains(r#"class="coverage""#));
    }

    #[test]
    fn test_plot_data() {
        let (nodes, problem) = create_test_problem();
        let solution = Solution::from_centers(&problem, vec![0, 3], "test");
        let data = Visualizer::new().export_plot_data(&nodes, &problem, &solution);

        assert!(data.contains("1,1,0,0,1\n"));
        assert!(data.contains("0,3\n"));
    }
}
