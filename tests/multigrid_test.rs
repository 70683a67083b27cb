//! Multigrid preconditioners driven through the public API.

use std::sync::Arc;

use dg_ns::multigrid::{
    CoarseGridSolver, LevelOperator, MultigridData, MultigridOperatorType, MultigridPreconditionerMomentum,
    MultigridPreconditionerPoisson, MultigridType, SmootherData, SmootherType,
};
use dg_ns::operators::{LaplaceOperator, LaplaceOperatorData};
use dg_ns::solver::{ConjugateGradient, JacobiPreconditioner, Preconditioner, SolverData};
use dg_ns::{
    BoundaryDescriptorP, BoundaryDescriptorU, ConstantScalar, DofVector, MatrixFreeContext, Mesh2D, MeshHierarchy,
    MomentumOperator, MomentumOperatorData, ViscosityModel, ZeroFunction,
};
use parking_lot::RwLock;

fn hierarchy(n_refinements: usize) -> Arc<RwLock<MeshHierarchy>> {
    let coarse = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
    Arc::new(RwLock::new(MeshHierarchy::new(coarse, n_refinements)))
}

fn wall_boundaries() -> BoundaryDescriptorU {
    (1..=4).fold(BoundaryDescriptorU::new(), |d, id| d.with_dirichlet(id, Arc::new(ZeroFunction)))
}

fn oscillating(mf: &MatrixFreeContext, n_components: usize) -> DofVector {
    let mut v = mf.create_vector(n_components);
    for k in 0..mf.n_elements() {
        for q in 0..mf.n_nodes() {
            let (x, y) = mf.mapping().point(k, q);
            for c in 0..n_components {
                v.set(k, c, q, (7.0 * x + c as f64).sin() * (3.0 * y).cos() + 0.3);
            }
        }
    }
    v
}

#[test]
fn test_reaction_diffusion_levels_ignore_linearization_velocity() {
    let h = hierarchy(1);
    let data = MomentumOperatorData {
        convective_problem: true,
        viscosity: ViscosityModel::Constant(0.05),
        ..MomentumOperatorData::default()
    };
    let descriptor = wall_boundaries();
    let mut mg = MultigridPreconditionerMomentum::initialize(
        Arc::clone(&h),
        2,
        &descriptor,
        &data,
        MultigridData::new(MultigridType::HPMG),
        MultigridOperatorType::ReactionDiffusion,
        false,
    )
    .unwrap();

    let mf = Arc::new(MatrixFreeContext::new(h.read().finest(), 2));
    let mut pde = MomentumOperator::new(Arc::clone(&mf), &descriptor, data).unwrap();
    pde.set_scaling_factor_mass_matrix(20.0);
    let src = oscillating(&mf, 2);

    let mut responses = Vec::new();
    for speed in [0.0, 5.0] {
        let mut velocity = mf.create_vector(2);
        velocity.fill(speed);
        pde.set_velocity_copy(&velocity).unwrap();
        mg.update(&pde).unwrap();
        let mut dst = mf.create_vector(2);
        mg.vmult(&mut dst, &src);
        responses.push(dst);
    }
    assert_eq!(responses[0].as_slice(), responses[1].as_slice());
    for level in 0..mg.multigrid().n_levels() {
        assert!(!mg.get_operator(level).unwrap().data().convective_problem);
    }
}

#[test]
fn test_convection_levels_follow_linearization_velocity() {
    let h = hierarchy(1);
    let data = MomentumOperatorData {
        convective_problem: true,
        ..MomentumOperatorData::default()
    };
    let descriptor = wall_boundaries();
    let mut mg = MultigridPreconditionerMomentum::initialize(
        Arc::clone(&h),
        2,
        &descriptor,
        &data,
        MultigridData::new(MultigridType::HMG),
        MultigridOperatorType::ReactionConvectionDiffusion,
        false,
    )
    .unwrap();

    let mf = Arc::new(MatrixFreeContext::new(h.read().finest(), 2));
    let mut pde = MomentumOperator::new(Arc::clone(&mf), &descriptor, data).unwrap();
    let mut velocity = mf.create_vector(2);
    velocity.fill(0.7);
    pde.set_velocity_copy(&velocity).unwrap();
    mg.update(&pde).unwrap();

    // a constant field is resolved on every level
    for level in 0..mg.multigrid().n_levels() {
        let u = mg.get_operator(level).unwrap().get_velocity();
        assert!((u.norm_max() - 0.7).abs() < 1e-12);
    }
}

#[test]
fn test_momentum_multigrid_beats_point_jacobi() {
    let h = hierarchy(2);
    let data = MomentumOperatorData {
        viscosity: ViscosityModel::Constant(1.0),
        ..MomentumOperatorData::default()
    };
    let descriptor = wall_boundaries();
    let mf = Arc::new(MatrixFreeContext::new(h.read().finest(), 2));
    let mut pde = MomentumOperator::new(Arc::clone(&mf), &descriptor, data.clone()).unwrap();
    pde.set_scaling_factor_mass_matrix(1.0);

    let multigrid_data = MultigridData::new(MultigridType::HMG)
        .with_smoother(SmootherType::Chebyshev, SmootherData::default())
        .with_coarse_solver(CoarseGridSolver::DirectLU, SolverData::default());
    let mut mg = MultigridPreconditionerMomentum::initialize(
        Arc::clone(&h),
        2,
        &descriptor,
        &data,
        multigrid_data,
        MultigridOperatorType::ReactionDiffusion,
        false,
    )
    .unwrap();
    mg.update(&pde).unwrap();
    let jacobi = JacobiPreconditioner::from_diagonal(&pde.compute_diagonal());

    let b = oscillating(&mf, 2);
    let solver = ConjugateGradient::new(SolverData::new(1e-10, 1000));
    let mut x_mg = mf.create_vector(2);
    let with_mg = solver.solve(&pde, &b, &mut x_mg, &mg);
    let mut x_jacobi = mf.create_vector(2);
    let with_jacobi = solver.solve(&pde, &b, &mut x_jacobi, &jacobi);

    assert!(with_mg.is_converged() && with_jacobi.is_converged());
    assert!(with_mg.iterations < with_jacobi.iterations);
    x_mg.axpy(-1.0, &x_jacobi);
    assert!(x_mg.norm_max() < 1e-7);
}

#[test]
fn test_poisson_multigrid_on_distorted_mesh() {
    let vertices = vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (2.0, 0.0),
        (0.0, 1.0),
        (1.2, 0.8),
        (2.0, 1.0),
        (0.0, 2.0),
        (0.9, 2.0),
        (2.0, 2.0),
    ];
    let cells = vec![[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
    let coarse = Mesh2D::from_cells(vertices, cells, |_, _| 1);
    let h = Arc::new(RwLock::new(MeshHierarchy::new(coarse, 2)));
    let descriptor = BoundaryDescriptorP::new().with_dirichlet(1, Arc::new(ConstantScalar(0.0)));
    let laplace_data = LaplaceOperatorData::default();

    let mg = MultigridPreconditionerPoisson::initialize(
        Arc::clone(&h),
        3,
        &descriptor,
        laplace_data,
        MultigridData::new(MultigridType::HPMG),
    )
    .unwrap();
    let mf = Arc::new(MatrixFreeContext::new(h.read().finest(), 3));
    let laplace = LaplaceOperator::new(Arc::clone(&mf), &descriptor, laplace_data).unwrap();

    let b = oscillating(&mf, 1);
    let mut x = mf.create_vector(1);
    let result = ConjugateGradient::new(SolverData::new(1e-10, 500)).solve(&laplace, &b, &mut x, &mg);
    assert!(result.is_converged());
    assert!(result.iterations < 40, "{} iterations", result.iterations);
}
