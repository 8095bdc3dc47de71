//! Signal Operators
//!
//! Every operator creates a new derived signal right away, wired as a
//! successor of each operand and initialized from the operands' current
//! values.
//!
//! - `&a + &b`, `&a - &b`, `&a * &b`, `&a / &b`, `&a % &b` for any mix of
//!   `Signal` and `VarSignal` operands
//! - `map` for unary functions, including operations with constants
//! - `lt`, `le`, `gt`, `ge` between two signals, and `above`, `below`,
//!   `at_least`, `at_most`, `equals` against a constant threshold
//! - `lift2` and `combine` for arbitrary functions of several signals

use std::ops::{Add, Div, Mul, Rem, Sub};

use super::abort_on;
use super::signal::{eq_policy, Signal, VarSignal};
use crate::graph::Predecessors;

/// Anything that can be used where a signal is expected.
pub trait AsSignal<T> {
    fn as_signal(&self) -> &Signal<T>;
}

impl<T> AsSignal<T> for Signal<T> {
    fn as_signal(&self) -> &Signal<T> {
        self
    }
}

impl<T> AsSignal<T> for VarSignal<T> {
    fn as_signal(&self) -> &Signal<T> {
        self
    }
}

/// Signal computed from two signals of the same domain.
///
/// # Panics
///
/// Panics if `a` and `b` belong to different domains.
pub fn lift2<A, B, T, F>(a: &Signal<A>, b: &Signal<B>, f: F) -> Signal<T>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&A, &B) -> T + Send + Sync + 'static,
{
    abort_on(a.domain().ensure_same(b.domain()));

    let (left, right) = (a.clone(), b.clone());
    Signal::derive(a.domain(), &[a.id(), b.id()], eq_policy::<T>(), move || {
        let l = left.get();
        right.with(|r| f(&l, r))
    })
}

/// A tuple of signals that can be combined with [`combine`].
pub trait SignalPack: Clone + Send + Sync + 'static {
    /// Tuple of the current values.
    type Values;

    fn domain(&self) -> &super::Domain;

    /// Operand ids, in tuple order.
    fn ids(&self) -> Predecessors;

    /// Fails if the signals span more than one domain.
    fn check_domain(&self) -> Result<(), crate::ReactError>;

    fn values(&self) -> Self::Values;
}

macro_rules! impl_signal_pack {
    ($(($ty:ident, $sig:ident)),+) => {
        impl<$($ty),+> SignalPack for ($(Signal<$ty>,)+)
        where
            $($ty: Clone + Send + Sync + 'static,)+
        {
            type Values = ($($ty,)+);

            fn domain(&self) -> &super::Domain {
                self.0.domain()
            }

            fn ids(&self) -> Predecessors {
                let ($($sig,)+) = self;
                let mut ids = Predecessors::new();
                $( ids.push($sig.id()); )+
                ids
            }

            fn check_domain(&self) -> Result<(), crate::ReactError> {
                let ($($sig,)+) = self;
                $( self.0.domain().ensure_same($sig.domain())?; )+
                Ok(())
            }

            fn values(&self) -> Self::Values {
                let ($($sig,)+) = self;
                ($($sig.get(),)+)
            }
        }
    };
}

impl_signal_pack!((A, a));
impl_signal_pack!((A, a), (B, b));
impl_signal_pack!((A, a), (B, b), (C, c));
impl_signal_pack!((A, a), (B, b), (C, c), (D, d));
impl_signal_pack!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_signal_pack!((A, a), (B, b), (C, c), (D, d), (E, e), (G, g));

/// Signal computed by `f` from a tuple of signals.
///
/// ```rust
/// use ripple_core::{combine, Domain};
///
/// let domain = Domain::new("combine");
/// let w = domain.make_var(60);
/// let h = domain.make_var(70);
/// let d = domain.make_var(8);
///
/// let volume = combine((w.signal(), h.signal(), d.signal()), |(w, h, d)| w * h * d);
/// assert_eq!(volume.get(), 33600);
/// ```
///
/// # Panics
///
/// Panics if the signals belong to different domains.
pub fn combine<P, T, F>(signals: P, f: F) -> Signal<T>
where
    P: SignalPack,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(P::Values) -> T + Send + Sync + 'static,
{
    abort_on(signals.check_domain());

    let domain = signals.domain().clone();
    let ids = signals.ids();
    Signal::derive(&domain, &ids, eq_policy::<T>(), move || f(signals.values()))
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Signal of `f` applied to this signal's value.
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        Signal::derive(self.domain(), &[self.id()], eq_policy::<U>(), move || {
            source.with(|v| f(v))
        })
    }
}

macro_rules! comparison {
    ($($name:ident => $op:tt),* $(,)?) => {
        impl<T> Signal<T>
        where
            T: Clone + PartialOrd + Send + Sync + 'static,
        {
            $(
                #[doc = concat!("Boolean signal of `self ", stringify!($op), " rhs`.")]
                pub fn $name(&self, rhs: &impl AsSignal<T>) -> Signal<bool> {
                    lift2(self, rhs.as_signal(), |a, b| a $op b)
                }
            )*
        }
    };
}

comparison! {
    lt => <,
    le => <=,
    gt => >,
    ge => >=,
}

macro_rules! threshold {
    ($($name:ident => $op:tt),* $(,)?) => {
        impl<T> Signal<T>
        where
            T: Clone + PartialOrd + Send + Sync + 'static,
        {
            $(
                #[doc = concat!("Boolean signal of `self ", stringify!($op), " threshold`.")]
                pub fn $name(&self, threshold: T) -> Signal<bool> {
                    self.map(move |v| *v $op threshold)
                }
            )*
        }
    };
}

threshold! {
    above => >,
    below => <,
    at_least => >=,
    at_most => <=,
    equals => ==,
}

macro_rules! binary_op {
    ($($trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl<'a, 'b, T, R> $trait<&'b R> for &'a Signal<T>
            where
                T: $trait<Output = T> + Clone + PartialEq + Send + Sync + 'static,
                R: AsSignal<T>,
            {
                type Output = Signal<T>;

                fn $method(self, rhs: &'b R) -> Signal<T> {
                    lift2(self, rhs.as_signal(), |a: &T, b: &T| a.clone().$method(b.clone()))
                }
            }

            impl<'a, 'b, T, R> $trait<&'b R> for &'a VarSignal<T>
            where
                T: $trait<Output = T> + Clone + PartialEq + Send + Sync + 'static,
                R: AsSignal<T>,
            {
                type Output = Signal<T>;

                fn $method(self, rhs: &'b R) -> Signal<T> {
                    lift2(self.as_signal(), rhs.as_signal(), |a: &T, b: &T| a.clone().$method(b.clone()))
                }
            }
        )*
    };
}

binary_op! {
    Add::add,
    Sub::sub,
    Mul::mul,
    Div::div,
    Rem::rem,
}
