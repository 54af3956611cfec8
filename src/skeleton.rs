//! Vertices, edges and orientation of a complete triangulation.
//!
//! Computed in one pass from scratch, independently of the incremental trackers used while
//! searching, so search results can be checked against it.

use crate::{
    edge_class::{EDGE_NUMBER, EDGE_VERTEX},
    gluing::GluingPerms,
    pairing::FacetSpec,
    union_find::{TwistedUnionFind, Union},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    n_tets: usize,
    /// Class index of every tetrahedron vertex `v + 4t`.
    vertex_of: Vec<usize>,
    /// Class index of every tetrahedron edge `e + 6t`.
    edge_of: Vec<usize>,
    n_vertices: usize,
    n_edges: usize,
    edge_degrees: Vec<usize>,
    valid_edges: bool,
    orientable: bool,
}

/// Renumbers union–find roots as consecutive class indices, in order of first appearance.
fn number_classes(roots: &[usize]) -> (Vec<usize>, usize) {
    let mut index = vec![usize::MAX; roots.len()];
    let mut n = 0;
    let classes = roots
        .iter()
        .map(|&r| {
            if index[r] == usize::MAX {
                index[r] = n;
                n += 1;
            }
            index[r]
        })
        .collect();
    (classes, n)
}

impl Skeleton {
    /// The skeleton of a complete gluing.
    ///
    /// # Panics
    ///
    /// In debug builds, if some gluing is not chosen.
    pub fn new(perms: &GluingPerms) -> Self {
        debug_assert!(perms.is_complete());
        let n_tets = perms.size();
        let pairing = perms.pairing();

        let mut vertices = TwistedUnionFind::new(4 * n_tets);
        let mut edges = TwistedUnionFind::new(6 * n_tets);
        let mut tets = TwistedUnionFind::new(n_tets);
        let mut valid_edges = true;
        let mut orientable = true;

        for face in FacetSpec::all(n_tets) {
            let adj = pairing.dest(face);
            if adj < face {
                continue;
            }
            let p = perms.perm(face);

            // Gluings that preserve orientation are odd.
            if tets.union(face.simp, adj.simp, p.sign() > 0) == Union::Twisted {
                orientable = false;
            }

            let v1 = face.facet;
            let w1 = p[v1];
            for v2 in (0..4).filter(|&v2| v2 != v1) {
                vertices.union(v2 + 4 * face.simp, p[v2] + 4 * adj.simp, false);

                let w2 = p[v2];
                let e = 5 - EDGE_NUMBER[v1][v2];
                let f = 5 - EDGE_NUMBER[w1][w2];
                let twist = p[EDGE_VERTEX[e][0]] > p[EDGE_VERTEX[e][1]];
                if edges.union(e + 6 * face.simp, f + 6 * adj.simp, twist) == Union::Twisted {
                    valid_edges = false;
                }
            }
        }

        let (vertex_of, n_vertices) = number_classes(&vertices.roots());
        let (edge_of, n_edges) = number_classes(&edges.roots());
        let mut edge_degrees = vec![0; n_edges];
        for &class in &edge_of {
            edge_degrees[class] += 1;
        }

        Skeleton {
            n_tets,
            vertex_of,
            edge_of,
            n_vertices,
            n_edges,
            edge_degrees,
            valid_edges,
            orientable,
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// The number of tetrahedron edges in each edge class.
    pub fn edge_degrees(&self) -> &[usize] {
        &self.edge_degrees
    }

    /// Whether no edge is identified with itself in reverse.
    pub fn has_valid_edges(&self) -> bool {
        self.valid_edges
    }

    pub fn is_orientable(&self) -> bool {
        self.orientable
    }

    /// The vertex class of tetrahedron vertex `v` of tetrahedron `tet`.
    pub fn vertex_class(&self, tet: usize, v: usize) -> usize {
        self.vertex_of[v + 4 * tet]
    }

    /// The edge class of edge `e` of tetrahedron `tet`.
    pub fn edge_class(&self, tet: usize, e: usize) -> usize {
        self.edge_of[e + 6 * tet]
    }

    /// The Euler characteristic of every vertex link.
    ///
    /// A link has one triangle per tetrahedron vertex, three half-edges per triangle, and
    /// one vertex per edge end meeting the vertex.
    pub fn vertex_link_euler(&self) -> Vec<i64> {
        let mut triangles = vec![0i64; self.n_vertices];
        for &class in &self.vertex_of {
            triangles[class] += 1;
        }

        let mut ends = vec![0i64; self.n_vertices];
        let mut seen = vec![false; self.n_edges];
        for tet in 0..self.n_tets {
            for (e, ends_of_e) in EDGE_VERTEX.iter().enumerate() {
                let class = self.edge_class(tet, e);
                if std::mem::replace(&mut seen[class], true) {
                    continue;
                }
                for &v in ends_of_e {
                    ends[self.vertex_class(tet, v)] += 1;
                }
            }
        }

        ends.iter()
            .zip(&triangles)
            .map(|(&v, &f)| v - 3 * f / 2 + f)
            .collect()
    }

    /// A valid closed 3-manifold: valid edges and every vertex link a sphere.
    pub fn is_closed_manifold(&self) -> bool {
        self.valid_edges && self.vertex_link_euler().iter().all(|&chi| chi == 2)
    }

    /// Euler characteristic of the triangulation, `V - E + F - T`.
    pub fn euler_characteristic(&self) -> i64 {
        self.n_vertices as i64 - self.n_edges as i64 + self.n_tets as i64
    }
}
