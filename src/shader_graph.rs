//! Translation of [`Material`] values into shading node graphs.
//!
//! The graph mirrors what node-based renderers expect: typed nodes with
//! constant inputs, and links from an output socket to an input socket.

use std::path::PathBuf;

use serde::Serialize;

use crate::material::{Material, MaterialKind, NoiseSettings, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Principled {
        base_color: Rgba,
        metallic: f32,
        roughness: f32,
    },
    Noise {
        settings: NoiseSettings,
    },
    ColorRamp {
        stops: [(f32, Rgba); 2],
    },
    Bump {
        strength: f32,
    },
    Emission {
        color: Rgba,
        strength: f32,
    },
    MixShader {
        factor: f32,
    },
    ImageTexture {
        path: PathBuf,
    },
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Socket {
    pub node: NodeId,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub from: Socket,
    pub to: Socket,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShaderGraph {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl ShaderGraph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn link(&mut self, from: NodeId, from_socket: &'static str, to: NodeId, to_socket: &'static str) {
        self.links.push(Link {
            from: Socket {
                node: from,
                name: from_socket,
            },
            to: Socket {
                node: to,
                name: to_socket,
            },
        });
    }

    /// Links leaving the given output socket.
    pub fn fan_out(&self, node: NodeId, socket: &str) -> Vec<Socket> {
        self.links
            .iter()
            .filter(|l| l.from.node == node && l.from.name == socket)
            .map(|l| l.to)
            .collect()
    }

    pub fn find(&self, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.nodes.iter().position(pred).map(NodeId)
    }

    pub fn from_material(material: &Material) -> Self {
        let mut g = ShaderGraph::default();
        let output = g.add(Node::Output);
        match &material.kind {
            MaterialKind::Simple(s) => {
                let bsdf = g.add(Node::Principled {
                    base_color: s.base_color,
                    metallic: s.metallic,
                    roughness: s.roughness,
                });
                g.link(bsdf, "BSDF", output, "Surface");
            }
            MaterialKind::Wear(w) => {
                let noise = g.add(Node::Noise { settings: w.noise });
                let ramp = g.add(Node::ColorRamp {
                    stops: [(w.ramp.low, w.ramp.worn), (w.ramp.high, w.ramp.clean)],
                });
                let bsdf = g.add(Node::Principled {
                    base_color: w.ramp.clean,
                    metallic: w.metallic,
                    roughness: w.roughness,
                });
                let emission = g.add(Node::Emission {
                    color: w.ramp.worn,
                    strength: w.emission_strength,
                });
                let bump = g.add(Node::Bump {
                    strength: w.bump_strength,
                });
                let mix = g.add(Node::MixShader { factor: 0.5 });

                g.link(noise, "Color", ramp, "Fac");
                g.link(ramp, "Color", bsdf, "Base Color");
                g.link(ramp, "Color", emission, "Color");
                g.link(ramp, "Color", mix, "Fac");
                g.link(noise, "Color", bump, "Height");
                g.link(bump, "Normal", bsdf, "Normal");
                g.link(bsdf, "BSDF", mix, "Shader1");
                g.link(emission, "Emission", mix, "Shader2");
                g.link(mix, "Shader", output, "Surface");
            }
            MaterialKind::Glow(glow) => {
                let emission = g.add(Node::Emission {
                    color: glow.color,
                    strength: glow.strength,
                });
                let bsdf = g.add(Node::Principled {
                    base_color: glow.color,
                    metallic: glow.metallic,
                    roughness: glow.roughness,
                });
                let mix = g.add(Node::MixShader { factor: glow.mix });
                g.link(emission, "Emission", mix, "Shader1");
                g.link(bsdf, "BSDF", mix, "Shader2");
                g.link(mix, "Shader", output, "Surface");
            }
            MaterialKind::Image(tex) => {
                let image = g.add(Node::ImageTexture {
                    path: tex.path.clone(),
                });
                let bsdf = g.add(Node::Principled {
                    base_color: [1.0, 1.0, 1.0, 1.0],
                    metallic: 0.0,
                    roughness: tex.roughness,
                });
                g.link(image, "Color", bsdf, "Base Color");
                g.link(bsdf, "BSDF", output, "Surface");
            }
        }
        g
    }
}
