pub mod cache;
pub mod plan;
pub mod predicate;
pub mod signature;

pub use cache::{DescriptorCache, ResolvedQuery};
pub use plan::{OrderDirection, OrderSpec, Page, PageRequest, PageSpec, SelectSpec};
pub use predicate::{CompareOp, ComparePredicate, Operand, Predicate};
pub use signature::{QueryDescriptor, QueryVerb, SignatureError, derive};
