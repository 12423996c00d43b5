pub mod cms_pfs;
pub mod federal_register;
pub mod openfda;
