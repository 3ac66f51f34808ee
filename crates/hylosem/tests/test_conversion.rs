//! Nominal conversion scenarios

use hylosem::{convert_to_atoms, convert_to_vars, Mode, Nominal, SatOp, SimpleType, Term};

fn var(name: &str) -> Nominal {
    Nominal::var(name, 0, SimpleType::top())
}

fn atom(name: &str) -> Nominal {
    Nominal::atom(name, SimpleType::top())
}

#[test]
fn shared_reference_gets_one_name() {
    // X2 is referenced from two places; both mentions convert to the
    // same generated atom
    let mut lf = Term::conj(vec![
        Term::satop(
            var("X1"),
            Term::conj(vec![
                Term::prop("see"),
                Term::diamond(Mode::label("Subj"), Term::nom(var("X2"))),
                Term::diamond(Mode::label("Obj"), Term::nom(var("X2"))),
            ]),
        ),
        Term::satop(var("X2"), Term::prop("dog")),
    ]);
    convert_to_atoms(&mut lf, None, None);
    let shown = lf.to_string();
    assert!(shown.contains("<Subj>d1"), "got {shown}");
    assert!(shown.contains("<Obj>d1"), "got {shown}");
    assert!(shown.contains("@d1(dog)"), "got {shown}");
}

#[test]
fn conversion_returns_the_new_root() {
    let mut lf = Term::satop(var("X1"), Term::prop("run"));
    let root = convert_to_atoms(&mut lf, None, Some(&var("X1")));
    assert_eq!(root, Some(atom("r1")));
}

#[test]
fn atoms_to_vars_covers_both_positions() {
    let mut preds = vec![
        SatOp::new(atom("w0"), Term::prop("dog")),
        SatOp::new(atom("w1"), Term::prop("run")),
        SatOp::new(
            atom("w1"),
            Term::diamond(Mode::label("Subj"), Term::nom(atom("w0"))),
        ),
    ];
    let root = convert_to_vars(&mut preds, Some(&atom("w1")));
    assert_eq!(root, Some(var("W1")));
    assert!(preds.iter().all(|p| p.nominal.is_var()));
    assert_eq!(preds[2].to_string(), "@W1_0(<Subj>W0_0)");
}
