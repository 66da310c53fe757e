pub mod package;
pub mod package_version;

pub mod epss;
pub mod friends_of_php;
pub mod gcve;
pub mod license;
pub mod nvd;
pub mod osv;

pub mod cwe;

pub mod mirror_state;
pub mod package_vulnerability;
