use ndarray::array;
use crate::activations::Activation;

#[test]
fn test_relu() {
    let mut x = array![[-1.0, 0.0, 2.5]];
    Activation::Relu.apply_batch(&mut x);
    assert_eq!(x, array![[0.0, 0.0, 2.5]]);
    assert_eq!(Activation::Relu.derivative_batch(array![[-1.0, 3.0]].view()), array![[0.0, 1.0]]);
}

#[test]
fn test_linear_is_identity() {
    let mut x = array![[-1.0, 4.0]];
    Activation::Linear.apply_batch(&mut x);
    assert_eq!(x, array![[-1.0, 4.0]]);
    assert_eq!(Activation::Linear.derivative_batch(x.view()), array![[1.0, 1.0]]);
}

#[test]
fn test_sigmoid_and_tanh_at_zero() {
    let mut s = array![[0.0]];
    Activation::Sigmoid.apply_batch(&mut s);
    assert!((s[[0, 0]] - 0.5).abs() < 1e-6);
    assert!((Activation::Sigmoid.derivative_batch(array![[0.0]].view())[[0, 0]] - 0.25).abs() < 1e-6);

    let mut t = array![[0.0]];
    Activation::Tanh.apply_batch(&mut t);
    assert_eq!(t[[0, 0]], 0.0);
    assert!((Activation::Tanh.derivative_batch(array![[0.0]].view())[[0, 0]] - 1.0).abs() < 1e-6);
}
